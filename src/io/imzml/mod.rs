//! Implements a parser for the imzML (Imaging Mass Spectrometry Markup Language) format
//! for representing mass spectrometry imaging data.
//!
//! imzML is based on mzML but stores binary data in an external `.ibd` file instead of
//! embedding it as base64 encoded data in the XML. This module reads the XML half: the
//! image-level metadata and, for every pixel, where its m/z and intensity arrays live in
//! the `.ibd` file.
//!
//! The document is read twice. The first pass reads everything before `<run>` into an
//! [`ImageMetadata`](crate::meta::ImageMetadata) and resolves the pixel geometry, the
//! second builds one [`SpectrumRecord`](crate::spectrum::SpectrumRecord) per spectrum.
//!
//! Data can be stored in two modes:
//! - **Continuous**: All spectra share the same m/z values
//! - **Processed**: Each spectrum has its own m/z and intensity arrays
//!
//! See: <https://www.ms-imaging.org/imzml/>

pub mod cv;
pub mod dispatch;
pub mod header;
pub mod ibd;
pub mod reader;
mod reading_shared;
pub mod scanner;
pub mod source;
pub mod spectra;
pub mod zaxis;

pub use header::{parse_header, resolve_pixel_size, ReferenceableGroup};
pub use ibd::{IbdError, IbdFile};
pub use reader::{ImzMLError, ImzMLParser};
pub use reading_shared::{ImzMLParserError, ImzMLParserState, ParserResult};
pub use scanner::{is_imzml, Line, LineKind, LineScanner};
pub use source::{ImzMLDataset, SpectrumSource};
pub use spectra::{parse_spectra, parse_spectra_with_groups, ArrayGroups};
pub use zaxis::{resolve_z_axis, ZAxisMode, ZAxisSummary};

// Re-export UUID for convenience
pub use uuid::Uuid;

#[cfg(test)]
mod tests;
