pub mod image;
pub mod units;

pub use crate::meta::image::{keys, ImageMetadata};
pub use crate::meta::units::{micrometer_to_millimeter, MICROMETERS_PER_MILLIMETER};
