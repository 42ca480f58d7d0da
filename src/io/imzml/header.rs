//! The first pass over an imzML document, which reads everything before the
//! `<run>` element into a [`PropertyStore`] and then resolves the pixel geometry.
use std::io::prelude::*;

use log::{debug, trace, warn};
use uuid::Uuid;

use crate::meta::{keys, micrometer_to_millimeter};
use crate::params::PropertyStore;
use crate::spectrum::{ArrayType, BinaryDataArrayType};

use super::cv::{Accession, ContextTag};
use super::dispatch::{DispatchTable, ParserState, Section};
use super::reading_shared::{parse_number, ImzMLParserError, ImzMLParserState, ParserResult};
use super::scanner::{Line, LineKind, LineScanner};

/// Pixel size substituted along x and y when the document declares none, in micrometers
pub const DEFAULT_PIXEL_SIZE_XY: f64 = 50.0;
/// Pixel size substituted along z, in micrometers
pub const DEFAULT_PIXEL_SIZE_Z: f64 = 10.0;

const DEFAULT_PIXEL_SIZE_MESSAGE: &str =
    "Pixel size x and y are default values, due to missing imzTags IMS:1000046 and IMS:1000047!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    const fn origin_key(&self) -> &'static str {
        match self {
            Self::X => keys::ORIGIN_X,
            Self::Y => keys::ORIGIN_Y,
            Self::Z => keys::ORIGIN_Z,
        }
    }
}

/// What to do with a recognised term in the document header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    /// Store the value as an unsigned integer under a fixed name
    UnsignedAs(&'static str),
    /// Store the value as an unsigned integer under the term's own name
    UnsignedByName,
    /// Store the value as a double under a fixed name
    DoubleAs(&'static str),
    /// Store the value, converted from micrometers, as the origin along an axis
    Origin(Axis),
    StorageMode(&'static str),
    Uuid,
    Checksum(&'static str),
}

fn header_action(accession: Accession) -> Option<HeaderAction> {
    use Accession::*;
    let action = match accession {
        MaxCountOfPixelsX => HeaderAction::UnsignedAs(keys::MAX_COUNT_OF_PIXEL_X),
        MaxCountOfPixelsY => HeaderAction::UnsignedAs(keys::MAX_COUNT_OF_PIXEL_Y),
        MaxDimensionX | MaxDimensionY => HeaderAction::UnsignedByName,
        PixelSizeX => HeaderAction::DoubleAs(keys::PIXEL_SIZE_X),
        PixelSizeY => HeaderAction::DoubleAs(keys::PIXEL_SIZE_Y),
        OriginX | CustomOriginX | LegacyOriginX => HeaderAction::Origin(Axis::X),
        OriginY | CustomOriginY | LegacyOriginY => HeaderAction::Origin(Axis::Y),
        CustomOriginZ | LegacyOriginZ => HeaderAction::Origin(Axis::Z),
        Continuous => HeaderAction::StorageMode("continuous"),
        Processed => HeaderAction::StorageMode("processed"),
        UniversallyUniqueIdentifier => HeaderAction::Uuid,
        IbdMD5 => HeaderAction::Checksum(keys::IBD_MD5),
        IbdSHA1 => HeaderAction::Checksum(keys::IBD_SHA1),
        _ => return None,
    };
    Some(action)
}

/// The description of one `<referenceableParamGroup>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceableGroup {
    pub id: String,
    /// The name of the array term, e.g. `m/z array`
    pub name: String,
    pub role: Option<ArrayType>,
    pub value_type: Option<BinaryDataArrayType>,
    pub compression: Option<String>,
    /// The name of a centroid or profile spectrum term
    pub spectrum_representation: Option<String>,
}

impl ReferenceableGroup {
    /// Read the body of a group whose start tag has just been consumed, up to and
    /// including the first end tag.
    pub fn read_from<R: BufRead>(id: String, scanner: &mut LineScanner<R>) -> ParserResult<Self> {
        let mut group = Self {
            id,
            ..Default::default()
        };
        while let Some(line) = scanner
            .next_line()
            .map_err(|e| ImzMLParserError::IOError(ImzMLParserState::ReferenceableParamGroup, e))?
        {
            if line.kind() == LineKind::Closing {
                break;
            }
            let Some(accession) = line.accession().and_then(|a| a.parse::<Accession>().ok())
            else {
                continue;
            };
            let name = line.attribute_or_empty("name");
            if let Some(dtype) = accession.value_type() {
                group.value_type = Some(dtype);
                continue;
            }
            match accession {
                Accession::MZArray => {
                    group.role = Some(ArrayType::MZArray);
                    group.name = name.to_string();
                }
                Accession::IntensityArray => {
                    group.role = Some(ArrayType::IntensityArray);
                    group.name = name.to_string();
                }
                Accession::ZlibCompression | Accession::NoCompression => {
                    group.compression = Some(name.to_string());
                }
                Accession::CentroidSpectrum | Accession::ProfileSpectrum => {
                    group.spectrum_representation = Some(name.to_string());
                }
                _ => {}
            }
        }
        Ok(group)
    }

    /// Record the group in `store`. Only groups that describe the m/z or the
    /// intensity array produce the name and value type properties.
    pub fn store_into<P: PropertyStore>(&self, store: &mut P) {
        if let Some(representation) = self.spectrum_representation.as_deref() {
            store.set_property(representation, "");
        }
        let Some(role) = self.role else {
            return;
        };
        let target_key = match role {
            ArrayType::MZArray => keys::MZ_GROUP_NAME,
            ArrayType::IntensityArray => keys::INTENSITY_GROUP_NAME,
        };
        store.set_property(target_key, self.name.as_str());
        store.set_property(self.name.as_str(), self.id.as_str());
        match self.value_type {
            Some(dtype) => {
                store.set_property(keys::value_type_bytes(&self.name), dtype.size_of());
                store.set_property(keys::value_type(&self.name), dtype.name());
            }
            None => {
                warn!("Referenceable param group {} does not declare a value type", self.id);
            }
        }
        if let Some(compression) = self.compression.as_deref() {
            store.set_property(keys::compression(&self.name), compression);
        }
    }
}

enum Step {
    Continue,
    ReadGroup(String),
    Done,
}

/**
A line-driven builder for the metadata section prior to the `<run>` element of
an imzML file.
*/
pub struct HeaderBuilder<'a, P: PropertyStore> {
    store: &'a mut P,
    state: ParserState,
    table: DispatchTable<HeaderAction>,
}

impl<'a, P: PropertyStore> HeaderBuilder<'a, P> {
    pub fn new(store: &'a mut P) -> Self {
        Self {
            store,
            state: ParserState::new(),
            table: DispatchTable::new(header_action),
        }
    }

    /// Reset the geometry properties to their unset values
    pub fn set_defaults(&mut self) {
        self.store.set_property(keys::MAX_COUNT_OF_PIXEL_Z, 1u64);
        self.store.set_property(keys::PIXEL_SIZE_X, -1.0);
        self.store.set_property(keys::PIXEL_SIZE_Y, -1.0);
        self.store.set_property(keys::PIXEL_SIZE_Z, -1.0);

        self.store.set_property(keys::ORIGIN_X, 0.0);
        self.store.set_property(keys::ORIGIN_Y, 0.0);
        self.store.set_property(keys::ORIGIN_Z, 0.0);
    }

    /// Consume lines from `scanner` until the `<run>` start tag or the end of the stream
    pub fn scan<R: BufRead>(&mut self, scanner: &mut LineScanner<R>) -> ParserResult {
        loop {
            let line = match scanner.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => return Err(ImzMLParserError::IOError(ImzMLParserState::Header, e)),
            };
            match self.handle_line(line)? {
                Step::Continue => {}
                Step::ReadGroup(id) => {
                    let group = ReferenceableGroup::read_from(id, scanner)?;
                    trace!("Read referenceable param group {group:?}");
                    group.store_into(&mut *self.store);
                    // The group consumed its own end tag
                    self.state.stack.pop();
                    self.state.clear_context();
                }
                Step::Done => break,
            }
        }
        if self.state.section != Section::Spectra {
            debug!("Reached the end of the document without finding <run>");
        }
        Ok(())
    }

    fn handle_line(&mut self, line: Line<'_>) -> ParserResult<Step> {
        match line.kind() {
            LineKind::Closing => {
                self.state.stack.pop();
                self.state.clear_context();
            }
            LineKind::SelfClosing => {
                if let Some(accession) = line.accession() {
                    match self.table.lookup_str(accession, &self.state.context) {
                        Some(action) => self.apply(action, line)?,
                        None => self.capture(line),
                    }
                }
            }
            LineKind::Opening => {
                let Some(tag) = line.tag_name() else {
                    return Ok(Step::Continue);
                };
                if let Some(ctx) = ContextTag::from_tag(tag) {
                    if ctx == ContextTag::Run {
                        self.state.enter_spectra();
                        return Ok(Step::Done);
                    }
                    self.state.stack.push(tag);
                    return Ok(self.enter_context(ctx, line));
                }
                self.state.stack.push(tag);
            }
            LineKind::Text => {}
        }
        Ok(Step::Continue)
    }

    fn enter_context(&mut self, tag: ContextTag, line: Line<'_>) -> Step {
        match tag {
            ContextTag::ReferenceableParamGroup => {
                return Step::ReadGroup(line.attribute_or_empty("id").to_string())
            }
            ContextTag::Software => {
                let context = format!(
                    "{} {}",
                    line.attribute_or_empty("id"),
                    line.attribute_or_empty("version")
                );
                self.state.set_context(context);
            }
            ContextTag::ScanSettings
            | ContextTag::InstrumentConfiguration
            | ContextTag::DataProcessing => {
                self.state.set_context(line.attribute_or_empty("id"));
            }
            ContextTag::Source => self.state.set_context("source"),
            ContextTag::Analyzer => self.state.set_context("analyzer"),
            ContextTag::Detector => self.state.set_context("detector"),
            ContextTag::ProcessingMethod => {
                let context = format!(
                    "{}processingMethod ({})",
                    self.state.context,
                    line.attribute_or_empty("order")
                );
                self.state.set_context(context);
            }
            _ => {}
        }
        Step::Continue
    }

    fn value<T: std::str::FromStr>(&self, line: Line<'_>) -> ParserResult<T> {
        parse_number(
            line.attribute_or_empty("value"),
            "value",
            line.as_str(),
            line.number(),
            ImzMLParserState::Header,
        )
    }

    fn apply(&mut self, action: HeaderAction, line: Line<'_>) -> ParserResult {
        match action {
            HeaderAction::UnsignedAs(key) => {
                let v: u64 = self.value(line)?;
                self.store.set_property(key, v);
            }
            HeaderAction::UnsignedByName => {
                let v: u64 = self.value(line)?;
                self.store.set_property(line.attribute_or_empty("name"), v);
            }
            HeaderAction::DoubleAs(key) => {
                let v: f64 = self.value(line)?;
                self.store.set_property(key, v);
            }
            HeaderAction::Origin(axis) => {
                let v: f64 = self.value(line)?;
                self.store
                    .set_property(axis.origin_key(), micrometer_to_millimeter(v));
            }
            HeaderAction::StorageMode(mode) => {
                self.store.set_property(keys::SPECTRUM_STORAGE_MODE, mode);
                self.capture(line);
            }
            HeaderAction::Uuid => {
                let raw = line.attribute_or_empty("value");
                let trimmed = raw.trim().trim_matches(&['{', '}'][..]);
                match Uuid::parse_str(trimmed) {
                    Ok(uuid) => self
                        .store
                        .set_property(keys::UUID, uuid.hyphenated().to_string()),
                    Err(e) => {
                        warn!("Failed to parse UUID '{raw}': {e}");
                        self.store.set_property(keys::UUID, raw);
                    }
                }
            }
            HeaderAction::Checksum(key) => {
                self.store
                    .set_property(key, line.attribute_or_empty("value").to_lowercase());
            }
        }
        Ok(())
    }

    /// Store an unrecognised term verbatim under its name, and under its name
    /// prefixed by the active context.
    fn capture(&mut self, line: Line<'_>) {
        let name = line.attribute_or_empty("name");
        let value = line.attribute_or_empty("value");
        trace!("Capturing {name:?} = {value:?} in context {:?}", self.state.context);
        if !self.state.context.is_empty() {
            self.store
                .set_property(keys::in_context(&self.state.context, name), value);
        }
        self.store.set_property(name, value);
    }

    /// Fill in and normalise the pixel geometry once the header has been read
    pub fn finish(self) -> ParserResult {
        resolve_pixel_size(self.store)
    }
}

fn numeric_property<P: PropertyStore>(store: &P, name: &str) -> ParserResult<Option<f64>> {
    match store.get_property(name) {
        None => Ok(None),
        Some(value) => match value.as_double() {
            Some(v) => Ok(Some(v)),
            None => Err(ImzMLParserError::MalformedProperty {
                name: name.to_string(),
                value: value.to_string(),
            }),
        },
    }
}

/// Resolve the pixel size along every axis to a positive length in millimeters.
///
/// The steps run in a fixed order, each one looking at the property values left
/// by the previous step:
///
/// 1. A bare `pixel size` is copied to `pixel size x`.
/// 2. If only x is set, it is a squared pixel area: both x and y become its
///    square root and the area is kept as `squared pixel size`.
/// 3. If both x and y are set, both are taken as linear sizes.
/// 4. If neither is set, both default to 50 µm and `pixel size info` says so.
///    If only y is set, x defaults to 50 µm in the same way.
/// 5. A missing z size defaults to 10 µm and the image has a single slice.
pub fn resolve_pixel_size<P: PropertyStore>(store: &mut P) -> ParserResult {
    if let Some(v) = numeric_property(&*store, keys::PIXEL_SIZE)? {
        store.set_property(keys::PIXEL_SIZE_X, v);
    }

    // Zero or negative sizes are as good as absent
    let mut x = numeric_property(&*store, keys::PIXEL_SIZE_X)?.unwrap_or(-1.0);
    let mut y = numeric_property(&*store, keys::PIXEL_SIZE_Y)?.unwrap_or(-1.0);
    if x <= 0.0 {
        x = -1.0;
    }
    if y <= 0.0 {
        y = -1.0;
    }

    if y == -1.0 && x > 0.0 {
        store.set_property(keys::SQUARED_PIXEL_SIZE, x);
        x = micrometer_to_millimeter(x.sqrt());
        y = x;
    } else if y > 0.0 && x > 0.0 {
        x = micrometer_to_millimeter(x);
        y = micrometer_to_millimeter(y);
    } else if y > 0.0 {
        warn!("Only the y pixel size was found, set x spacing to 50 microns!");
        x = micrometer_to_millimeter(DEFAULT_PIXEL_SIZE_XY);
        y = micrometer_to_millimeter(y);
        store.set_property(keys::PIXEL_SIZE_INFO, DEFAULT_PIXEL_SIZE_MESSAGE);
    }

    if y <= 0.0 && x <= 0.0 {
        x = micrometer_to_millimeter(DEFAULT_PIXEL_SIZE_XY);
        y = x;
        store.set_property(keys::PIXEL_SIZE_INFO, DEFAULT_PIXEL_SIZE_MESSAGE);
        warn!("No pixel size found, set x and y spacing to 50 microns!");
    }
    store.set_property(keys::PIXEL_SIZE_X, x);
    store.set_property(keys::PIXEL_SIZE_Y, y);

    match numeric_property(&*store, keys::PIXEL_SIZE_Z)? {
        Some(z) if z > 0.0 => {
            store.set_property(keys::PIXEL_SIZE_Z, micrometer_to_millimeter(z));
        }
        _ => {
            store.set_property(
                keys::PIXEL_SIZE_Z,
                micrometer_to_millimeter(DEFAULT_PIXEL_SIZE_Z),
            );
            store.set_property(keys::MAX_COUNT_OF_PIXEL_Z, 1u64);
        }
    }
    Ok(())
}

/// Run the first pass over `reader`, populating `store` with the image-level
/// metadata and resolving the pixel geometry.
pub fn parse_header<R: BufRead, P: PropertyStore>(reader: R, store: &mut P) -> ParserResult {
    let mut scanner = LineScanner::new(reader);
    let mut builder = HeaderBuilder::new(store);
    builder.set_defaults();
    builder.scan(&mut scanner)?;
    debug!("Read {} header lines", scanner.line_number());
    builder.finish()
}
