use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    ops::Range,
    path::{Path, PathBuf},
};

use thiserror::Error;
use uuid::Uuid;

use crate::meta::keys;
use crate::params::PropertyStore;
use crate::spectrum::{byte_range, BinaryDataArrayType};

#[derive(Debug, Error)]
pub enum IbdError {
    #[error("An IO error occurred while reading IBD file: {0}")]
    IoError(#[from] io::Error),
    #[error("IBD file UUID mismatch: expected {expected}, found {found}")]
    UuidMismatch { expected: Uuid, found: Uuid },
    #[error("The metadata UUID {0:?} is not a valid UUID")]
    InvalidUuid(String),
    #[error("Invalid data range: offset={offset}, length={length}")]
    InvalidRange { offset: u64, length: u64 },
}

impl From<IbdError> for io::Error {
    fn from(value: IbdError) -> Self {
        match value {
            IbdError::IoError(e) => e,
            _ => Self::new(io::ErrorKind::InvalidData, value),
        }
    }
}

/// UUID is 16 bytes stored in big-endian format at the start of IBD files
const UUID_SIZE: usize = 16;

/// Handle for reading the binary payload of an imzML dataset
#[derive(Debug)]
pub struct IbdFile {
    reader: BufReader<File>,
    uuid: Uuid,
    len: u64,
}

impl IbdFile {
    /// Open an IBD file from a path, reading its UUID header
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut uuid = [0u8; UUID_SIZE];
        reader.read_exact(&mut uuid)?;

        Ok(Self {
            reader,
            uuid: Uuid::from_bytes(uuid),
            len,
        })
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    /// The size of the file in bytes, including the UUID header
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Compare the file's UUID with the one declared in the metadata. Metadata
    /// without a UUID always matches.
    pub fn check_uuid<S: PropertyStore>(&self, metadata: &S) -> Result<(), IbdError> {
        let Some(declared) = metadata.get_text(keys::UUID) else {
            return Ok(());
        };
        let expected =
            Uuid::parse_str(declared).map_err(|_| IbdError::InvalidUuid(declared.to_string()))?;
        if expected != self.uuid {
            return Err(IbdError::UuidMismatch {
                expected,
                found: self.uuid,
            });
        }
        Ok(())
    }

    /// Read the raw bytes in `range`, which must lie within the file
    pub fn read_range(&mut self, range: Range<u64>) -> Result<Vec<u8>, IbdError> {
        let invalid = || IbdError::InvalidRange {
            offset: range.start,
            length: range.end.saturating_sub(range.start),
        };
        if range.start > range.end || range.end > self.len {
            return Err(invalid());
        }
        let size = usize::try_from(range.end - range.start).map_err(|_| invalid())?;
        self.reader.seek(SeekFrom::Start(range.start))?;
        let mut buffer = vec![0u8; size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read the raw bytes of an array of `length` elements of `dtype` starting
    /// at `offset`, as located by a
    /// [`SpectrumRecord`](crate::spectrum::SpectrumRecord)
    pub fn read_array(
        &mut self,
        offset: u64,
        length: u64,
        dtype: BinaryDataArrayType,
    ) -> Result<Vec<u8>, IbdError> {
        let range =
            byte_range(offset, length, dtype).ok_or(IbdError::InvalidRange { offset, length })?;
        self.read_range(range)
    }

    /// Derive the IBD file path from an imzML file path
    pub fn derive_ibd_path<P: AsRef<Path>>(imzml_path: P) -> PathBuf {
        imzml_path.as_ref().with_extension("ibd")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::meta::ImageMetadata;
    use crate::spectrum::SpectrumRecord;
    use std::io::Write;

    const UUID_TEXT: &str = "554a27fa-79d2-4766-9a2c-862e2b3da1f1";

    fn write_ibd(dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join("sample.ibd");
        let mut fh = File::create(&path)?;
        fh.write_all(Uuid::parse_str(UUID_TEXT).unwrap().as_bytes())?;
        for v in [100.0f32, 200.0, 300.0] {
            fh.write_all(&v.to_le_bytes())?;
        }
        Ok(path)
    }

    #[test]
    fn test_derive_ibd_path() {
        let ibd_path = IbdFile::derive_ibd_path("data/test.imzML");
        assert_eq!(ibd_path, Path::new("data/test.ibd"));
    }

    #[test]
    fn test_uuid_header() -> Result<(), IbdError> {
        let dir = tempfile::tempdir()?;
        let path = write_ibd(dir.path())?;
        let mut ibd = IbdFile::open(&path)?;
        assert_eq!(ibd.uuid().hyphenated().to_string(), UUID_TEXT);

        let mut meta = ImageMetadata::new();
        ibd.check_uuid(&meta)?;
        meta.set_property(keys::UUID, UUID_TEXT);
        ibd.check_uuid(&meta)?;
        meta.set_property(keys::UUID, "00000000-0000-0000-0000-000000000000");
        assert!(matches!(
            ibd.check_uuid(&meta),
            Err(IbdError::UuidMismatch { .. })
        ));

        let record = SpectrumRecord {
            mz_offset: 16,
            mz_length: 2,
            ..Default::default()
        };
        let range = record.mz_byte_range(BinaryDataArrayType::Float32).unwrap();
        let bytes = ibd.read_range(range)?;
        assert_eq!(bytes.len(), 8);
        assert_eq!(f32::from_le_bytes(bytes[4..8].try_into().unwrap()), 200.0);
        Ok(())
    }

    #[test]
    fn test_invalid_ranges() -> Result<(), IbdError> {
        let dir = tempfile::tempdir()?;
        let path = write_ibd(dir.path())?;
        let mut ibd = IbdFile::open(&path)?;
        assert_eq!(ibd.len(), 28);

        let bytes = ibd.read_array(20, 2, BinaryDataArrayType::Float32)?;
        assert_eq!(f32::from_le_bytes(bytes[..4].try_into().unwrap()), 200.0);

        assert!(matches!(
            ibd.read_range(16..64),
            Err(IbdError::InvalidRange {
                offset: 16,
                length: 48
            })
        ));
        assert!(matches!(
            ibd.read_array(16, u64::MAX / 2, BinaryDataArrayType::Float32),
            Err(IbdError::InvalidRange { offset: 16, .. })
        ));
        assert!(matches!(
            ibd.read_array(u64::MAX, 1, BinaryDataArrayType::Int64),
            Err(IbdError::InvalidRange { .. })
        ));

        let (start, end) = (24, 20);
        let err: io::Error = ibd.read_range(start..end).unwrap_err().into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        Ok(())
    }
}
