use std::{
    fs,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::meta::keys;
use crate::params::PropertyStore;

use super::header::parse_header;
use super::reading_shared::ImzMLParserError;
use super::source::{ImzMLDataset, SpectrumSource};
use super::spectra::{parse_spectra_with_groups, ArrayGroups};

const BUFFER_SIZE: usize = 10000;

/// Errors raised while loading a dataset, attributed to the file responsible
#[derive(Debug, Error)]
pub enum ImzMLError {
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: ImzMLParserError,
    },
}

impl ImzMLError {
    /// The file the error came from
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. } | Self::Source { path, .. } => path,
        }
    }
}

impl From<ImzMLError> for io::Error {
    fn from(value: ImzMLError) -> Self {
        match value {
            ImzMLError::Open { ref source, .. } => Self::new(source.kind(), value),
            ImzMLError::Source { .. } => Self::new(io::ErrorKind::InvalidData, value),
        }
    }
}

/**
Loads the metadata and spectrum index of an [`ImzMLDataset`] from its imzML
files.

Each source file is read twice, once for the image-level metadata and once for
the spectra. Sources are processed one after another and each file is closed
before the next is opened.
*/
#[derive(Debug, Clone, Copy)]
pub struct ImzMLParser {
    buffer_capacity: usize,
}

impl Default for ImzMLParser {
    fn default() -> Self {
        Self::with_buffer_capacity(BUFFER_SIZE)
    }
}

impl ImzMLParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_capacity(buffer_capacity: usize) -> Self {
        Self { buffer_capacity }
    }

    fn open(&self, path: &Path) -> Result<BufReader<fs::File>, ImzMLError> {
        let handle = fs::File::open(path).map_err(|source| ImzMLError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BufReader::with_capacity(self.buffer_capacity, handle))
    }

    /// Read the image-level metadata of every source into `dataset.metadata`,
    /// recording the array groups each source declares on that source
    pub fn read_image_metadata(&self, dataset: &mut ImzMLDataset) -> Result<(), ImzMLError> {
        for source in dataset.sources.iter_mut() {
            debug!("Reading image metadata from {}", source.imzml_path.display());
            let handle = self.open(&source.imzml_path)?;
            // Group names left over from an earlier source must not leak into this one
            dataset.metadata.remove_property(keys::MZ_GROUP_NAME);
            dataset.metadata.remove_property(keys::INTENSITY_GROUP_NAME);
            parse_header(handle, &mut dataset.metadata).map_err(|e| ImzMLError::Source {
                path: source.imzml_path.clone(),
                source: e,
            })?;
            source.array_groups = ArrayGroups::from_store(&dataset.metadata);
        }
        Ok(())
    }

    /// Build the spectrum index of every source. On failure no source keeps
    /// any records.
    pub fn read_spectrum_metadata(&self, dataset: &mut ImzMLDataset) -> Result<(), ImzMLError> {
        let result = self.read_spectra_of_sources(dataset);
        if result.is_err() {
            dataset.clear_spectra();
        }
        result
    }

    fn read_spectra_of_sources(&self, dataset: &mut ImzMLDataset) -> Result<(), ImzMLError> {
        let mut total = 0;
        for source in dataset.sources.iter_mut() {
            self.read_spectra_of(source, &mut dataset.metadata)?;
            total += source.len();
        }
        if dataset.sources.len() > 1 {
            dataset
                .metadata
                .set_property(keys::NUMBER_OF_MEASUREMENTS, total);
        }
        Ok(())
    }

    fn read_spectra_of<P: PropertyStore>(
        &self,
        source: &mut SpectrumSource,
        metadata: &mut P,
    ) -> Result<(), ImzMLError> {
        debug!("Reading spectra from {}", source.imzml_path.display());
        let handle = self.open(&source.imzml_path)?;
        source.spectra = parse_spectra_with_groups(handle, &source.array_groups, metadata)
            .map_err(|e| ImzMLError::Source {
                path: source.imzml_path.clone(),
                source: e,
            })?;
        Ok(())
    }

    /// Run both passes over every source of `dataset`
    pub fn load(&self, dataset: &mut ImzMLDataset) -> Result<(), ImzMLError> {
        self.read_image_metadata(dataset)?;
        self.read_spectrum_metadata(dataset)?;
        let [x, y, z] = dataset.metadata.dimensions();
        info!(
            "Loaded {} spectra for a {x}x{y}x{z} image from {} source(s)",
            dataset.len(),
            dataset.sources.len()
        );
        Ok(())
    }

    /// Load a single imzML file, expecting its `.ibd` file alongside it
    pub fn open_path<P: AsRef<Path>>(&self, path: P) -> Result<ImzMLDataset, ImzMLError> {
        let mut dataset = ImzMLDataset::from_paths([path]);
        self.load(&mut dataset)?;
        Ok(dataset)
    }
}
