//! The closed set of controlled vocabulary terms and element names the imzML
//! parser reacts to.
//!
//! Accessions are treated as opaque strings and matched verbatim; some of the
//! legacy origin terms (`IMS:X1`, `M2:0000001`) are not numeric at all.
use std::fmt::Display;
use std::str::FromStr;

use crate::spectrum::BinaryDataArrayType;

/// A recognised controlled vocabulary accession
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accession {
    // Image geometry
    MaxCountOfPixelsX,
    MaxCountOfPixelsY,
    MaxDimensionX,
    MaxDimensionY,
    PixelSizeX,
    PixelSizeY,
    /// `IMS:1000053`
    OriginX,
    /// `IMS:1000054`
    OriginY,
    /// `M2:0000001`, `M2:0000002`, `M2:0000003`
    CustomOriginX,
    CustomOriginY,
    CustomOriginZ,
    /// `IMS:X1`, `IMS:X2`, `IMS:X3`
    LegacyOriginX,
    LegacyOriginY,
    LegacyOriginZ,

    // File content
    Continuous,
    Processed,
    UniversallyUniqueIdentifier,
    IbdMD5,
    IbdSHA1,

    // Binary array description
    MZArray,
    IntensityArray,
    Float32,
    Float64,
    Int32,
    Int64,
    ImsInt32,
    ImsInt64,
    ZlibCompression,
    NoCompression,
    CentroidSpectrum,
    ProfileSpectrum,

    // Per spectrum
    PositionX,
    PositionY,
    PositionZ,
    ExternalOffset,
    ExternalArrayLength,
    TotalIonCurrent,
}

impl Accession {
    pub const fn curie(&self) -> &'static str {
        match self {
            Self::MaxCountOfPixelsX => "IMS:1000042",
            Self::MaxCountOfPixelsY => "IMS:1000043",
            Self::MaxDimensionX => "IMS:1000044",
            Self::MaxDimensionY => "IMS:1000045",
            Self::PixelSizeX => "IMS:1000046",
            Self::PixelSizeY => "IMS:1000047",
            Self::OriginX => "IMS:1000053",
            Self::OriginY => "IMS:1000054",
            Self::CustomOriginX => "M2:0000001",
            Self::CustomOriginY => "M2:0000002",
            Self::CustomOriginZ => "M2:0000003",
            Self::LegacyOriginX => "IMS:X1",
            Self::LegacyOriginY => "IMS:X2",
            Self::LegacyOriginZ => "IMS:X3",

            Self::Continuous => "IMS:1000030",
            Self::Processed => "IMS:1000031",
            Self::UniversallyUniqueIdentifier => "IMS:1000080",
            Self::IbdMD5 => "IMS:1000090",
            Self::IbdSHA1 => "IMS:1000091",

            Self::MZArray => "MS:1000514",
            Self::IntensityArray => "MS:1000515",
            Self::Float32 => "MS:1000521",
            Self::Float64 => "MS:1000523",
            Self::Int32 => "MS:1000519",
            Self::Int64 => "MS:1000522",
            Self::ImsInt32 => "IMS:1000141",
            Self::ImsInt64 => "IMS:1000142",
            Self::ZlibCompression => "MS:1000574",
            Self::NoCompression => "MS:1000576",
            Self::CentroidSpectrum => "MS:1000127",
            Self::ProfileSpectrum => "MS:1000128",

            Self::PositionX => "IMS:1000050",
            Self::PositionY => "IMS:1000051",
            Self::PositionZ => "IMS:1000052",
            Self::ExternalOffset => "IMS:1000102",
            Self::ExternalArrayLength => "IMS:1000103",
            Self::TotalIonCurrent => "MS:1000285",
        }
    }

    /// The numeric type this term declares for a binary array, if it is a
    /// data type term
    pub const fn value_type(&self) -> Option<BinaryDataArrayType> {
        match self {
            Self::Float32 => Some(BinaryDataArrayType::Float32),
            Self::Float64 => Some(BinaryDataArrayType::Float64),
            Self::Int32 | Self::ImsInt32 => Some(BinaryDataArrayType::Int32),
            Self::Int64 | Self::ImsInt64 => Some(BinaryDataArrayType::Int64),
            _ => None,
        }
    }
}

impl Display for Accession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.curie())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAccession(pub String);

impl Display for UnknownAccession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unrecognised accession {}", self.0)
    }
}

impl std::error::Error for UnknownAccession {}

impl FromStr for Accession {
    type Err = UnknownAccession;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let acc = match s {
            "IMS:1000042" => Self::MaxCountOfPixelsX,
            "IMS:1000043" => Self::MaxCountOfPixelsY,
            "IMS:1000044" => Self::MaxDimensionX,
            "IMS:1000045" => Self::MaxDimensionY,
            "IMS:1000046" => Self::PixelSizeX,
            "IMS:1000047" => Self::PixelSizeY,
            "IMS:1000053" => Self::OriginX,
            "IMS:1000054" => Self::OriginY,
            "M2:0000001" => Self::CustomOriginX,
            "M2:0000002" => Self::CustomOriginY,
            "M2:0000003" => Self::CustomOriginZ,
            "IMS:X1" => Self::LegacyOriginX,
            "IMS:X2" => Self::LegacyOriginY,
            "IMS:X3" => Self::LegacyOriginZ,

            "IMS:1000030" => Self::Continuous,
            "IMS:1000031" => Self::Processed,
            "IMS:1000080" => Self::UniversallyUniqueIdentifier,
            "IMS:1000090" => Self::IbdMD5,
            "IMS:1000091" => Self::IbdSHA1,

            "MS:1000514" => Self::MZArray,
            "MS:1000515" => Self::IntensityArray,
            "MS:1000521" => Self::Float32,
            "MS:1000523" => Self::Float64,
            "MS:1000519" => Self::Int32,
            "MS:1000522" => Self::Int64,
            "IMS:1000141" => Self::ImsInt32,
            "IMS:1000142" => Self::ImsInt64,
            "MS:1000574" => Self::ZlibCompression,
            "MS:1000576" => Self::NoCompression,
            "MS:1000127" => Self::CentroidSpectrum,
            "MS:1000128" => Self::ProfileSpectrum,

            "IMS:1000050" => Self::PositionX,
            "IMS:1000051" => Self::PositionY,
            "IMS:1000052" => Self::PositionZ,
            "IMS:1000102" => Self::ExternalOffset,
            "IMS:1000103" => Self::ExternalArrayLength,
            "MS:1000285" => Self::TotalIonCurrent,
            _ => return Err(UnknownAccession(s.to_string())),
        };
        Ok(acc)
    }
}

/// Element names whose start tag changes the parser's context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextTag {
    ReferenceableParamGroup,
    ReferenceableParamGroupRef,
    Software,
    ScanSettings,
    InstrumentConfiguration,
    Source,
    Analyzer,
    Detector,
    DataProcessing,
    ProcessingMethod,
    Run,
    SpectrumList,
    Spectrum,
}

impl ContextTag {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = match tag {
            "referenceableParamGroup" => Self::ReferenceableParamGroup,
            "referenceableParamGroupRef" => Self::ReferenceableParamGroupRef,
            "software" => Self::Software,
            "scanSettings" => Self::ScanSettings,
            "instrumentConfiguration" => Self::InstrumentConfiguration,
            "source" => Self::Source,
            "analyzer" => Self::Analyzer,
            "detector" => Self::Detector,
            "dataProcessing" => Self::DataProcessing,
            "processingMethod" => Self::ProcessingMethod,
            "run" => Self::Run,
            "spectrumList" => Self::SpectrumList,
            "spectrum" => Self::Spectrum,
            _ => return None,
        };
        Some(tag)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accession_round_trip_sample() {
        for acc in [
            Accession::MaxCountOfPixelsX,
            Accession::LegacyOriginZ,
            Accession::CustomOriginY,
            Accession::ExternalArrayLength,
            Accession::ImsInt64,
        ] {
            assert_eq!(acc.curie().parse::<Accession>(), Ok(acc));
        }
        assert_eq!(
            "IMS:9999999".parse::<Accession>(),
            Err(UnknownAccession("IMS:9999999".into()))
        );
        assert_eq!(Accession::OriginX.to_string(), "IMS:1000053");
    }

    #[test]
    fn test_value_types() {
        assert_eq!(
            Accession::Float64.value_type(),
            Some(BinaryDataArrayType::Float64)
        );
        assert_eq!(
            Accession::ImsInt32.value_type(),
            Some(BinaryDataArrayType::Int32)
        );
        assert_eq!(Accession::MZArray.value_type(), None);
    }

    #[test]
    fn test_context_tags() {
        assert_eq!(ContextTag::from_tag("run"), Some(ContextTag::Run));
        assert_eq!(
            ContextTag::from_tag("spectrumList"),
            Some(ContextTag::SpectrumList)
        );
        assert_eq!(ContextTag::from_tag("runner"), None);
    }
}
