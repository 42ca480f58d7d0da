pub mod io;
pub mod meta;
pub mod params;
pub mod spectrum;

pub use crate::io::imzml::{ImzMLDataset, ImzMLParser, SpectrumSource};
pub use crate::meta::ImageMetadata;
pub use crate::params::{PropertyStore, PropertyValue};
pub use crate::spectrum::SpectrumRecord;
