//! Reading mass spectrometry imaging data file formats.

pub mod imzml;

pub use crate::io::imzml::{
    is_imzml, ImzMLDataset, ImzMLError, ImzMLParser, ImzMLParserError, SpectrumSource,
};
