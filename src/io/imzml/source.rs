use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use uuid::Uuid;

use crate::meta::{keys, ImageMetadata};
use crate::params::PropertyStore;
use crate::spectrum::SpectrumRecord;

use super::ibd::{IbdError, IbdFile};
use super::spectra::ArrayGroups;

/// One imzML document, its binary companion, and the spectra it indexes
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpectrumSource {
    pub imzml_path: PathBuf,
    pub ibd_path: PathBuf,
    /// The array groups declared by this source's own header
    pub array_groups: ArrayGroups,
    pub spectra: Vec<SpectrumRecord>,
}

impl SpectrumSource {
    /// Create a source whose `.ibd` file sits next to the imzML file
    pub fn new<P: AsRef<Path>>(imzml_path: P) -> Self {
        let imzml_path = imzml_path.as_ref().to_path_buf();
        let ibd_path = IbdFile::derive_ibd_path(&imzml_path);
        Self::with_ibd_path(imzml_path, ibd_path)
    }

    pub fn with_ibd_path<P: Into<PathBuf>, Q: Into<PathBuf>>(imzml_path: P, ibd_path: Q) -> Self {
        Self {
            imzml_path: imzml_path.into(),
            ibd_path: ibd_path.into(),
            array_groups: ArrayGroups::default(),
            spectra: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn open_ibd(&self) -> io::Result<IbdFile> {
        IbdFile::open(&self.ibd_path)
    }

    /// Read the UUID stored in the first 16 bytes of the `.ibd` file
    pub fn read_ibd_uuid(&self) -> io::Result<Uuid> {
        Ok(*self.open_ibd()?.uuid())
    }

    /// Check the `.ibd` file's UUID against `metadata`, logging any problem.
    /// Returns `false` if the file could not be read or the UUIDs differ.
    pub fn check_ibd_uuid<S: PropertyStore>(&self, metadata: &S) -> bool {
        let ibd = match self.open_ibd() {
            Ok(ibd) => ibd,
            Err(e) => {
                warn!("Could not read {}: {e}", self.ibd_path.display());
                return false;
            }
        };
        match ibd.check_uuid(metadata) {
            Ok(()) => true,
            Err(e @ IbdError::UuidMismatch { .. }) => {
                warn!("{}: {e}", self.ibd_path.display());
                false
            }
            Err(e) => {
                warn!("Could not check {}: {e}", self.ibd_path.display());
                false
            }
        }
    }
}

/**
A mass spectrometry imaging dataset: the image-level metadata shared by all of
its sources, and the spectrum index of each source in load order.
*/
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImzMLDataset {
    pub metadata: ImageMetadata,
    pub sources: Vec<SpectrumSource>,
}

impl ImzMLDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dataset with one source per imzML path
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            metadata: ImageMetadata::new(),
            sources: paths.into_iter().map(SpectrumSource::new).collect(),
        }
    }

    pub fn add_source(&mut self, source: SpectrumSource) {
        self.sources.push(source);
    }

    /// The total number of spectra across all sources
    pub fn len(&self) -> usize {
        self.sources.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the spectra of every source in order
    pub fn spectra(&self) -> impl Iterator<Item = &SpectrumRecord> + '_ {
        self.sources.iter().flat_map(|s| s.spectra.iter())
    }

    pub fn clear_spectra(&mut self) {
        for source in self.sources.iter_mut() {
            source.spectra.clear();
        }
    }

    /// Whether all spectra share one m/z array, if the metadata says either way
    pub fn is_continuous(&self) -> Option<bool> {
        match self.metadata.get_text(keys::SPECTRUM_STORAGE_MODE) {
            Some("continuous") => Some(true),
            Some("processed") => Some(false),
            _ => None,
        }
    }

    /// Write the dataset's metadata and spectrum index as JSON
    #[cfg(feature = "serde")]
    pub fn to_writer<W: io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    /// Read a dataset previously written with [`ImzMLDataset::to_writer`]
    #[cfg(feature = "serde")]
    pub fn from_reader<R: io::Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}
