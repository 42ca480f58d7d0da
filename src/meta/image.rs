use indexmap::map::{Iter, Keys};
use indexmap::IndexMap;

use crate::params::{PropertyStore, PropertyValue};

/// Names of the properties the imzML parser reads and writes.
pub mod keys {
    pub const MAX_COUNT_OF_PIXEL_X: &str = "max count of pixel x";
    pub const MAX_COUNT_OF_PIXEL_Y: &str = "max count of pixel y";
    pub const MAX_COUNT_OF_PIXEL_Z: &str = "max count of pixel z";

    pub const PIXEL_SIZE: &str = "pixel size";
    pub const PIXEL_SIZE_X: &str = "pixel size x";
    pub const PIXEL_SIZE_Y: &str = "pixel size y";
    pub const PIXEL_SIZE_Z: &str = "pixel size z";
    pub const SQUARED_PIXEL_SIZE: &str = "squared pixel size";
    pub const PIXEL_SIZE_INFO: &str = "pixel size info";

    pub const ORIGIN_X: &str = "origin x";
    pub const ORIGIN_Y: &str = "origin y";
    pub const ORIGIN_Z: &str = "origin z";

    pub const NUMBER_OF_MEASUREMENTS: &str = "number of measurements";

    pub const MZ_GROUP_NAME: &str = "mzGroupName";
    pub const INTENSITY_GROUP_NAME: &str = "intensityGroupName";

    pub const UUID: &str = "universally unique identifier";
    pub const IBD_MD5: &str = "ibd MD5";
    pub const IBD_SHA1: &str = "ibd SHA-1";
    pub const SPECTRUM_STORAGE_MODE: &str = "spectrum storage mode";

    pub fn value_type(group_name: &str) -> String {
        format!("{group_name} value type")
    }

    pub fn value_type_bytes(group_name: &str) -> String {
        format!("{group_name} value type (bytes)")
    }

    pub fn compression(group_name: &str) -> String {
        format!("{group_name} compression")
    }

    pub fn in_context(context: &str, name: &str) -> String {
        format!("[{context}] {name}")
    }
}

/**
The image-level metadata of a mass spectrometry imaging dataset, an ordered
mapping from property name to typed value.

Geometry is kept in millimeters once the metadata has been resolved.
*/
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageMetadata {
    #[cfg_attr(feature = "serde", serde(with = "indexmap::map::serde_seq"))]
    pub properties: IndexMap<String, PropertyValue>,
}

impl ImageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn keys(&self) -> Keys<'_, String, PropertyValue> {
        self.properties.keys()
    }

    pub fn iter(&self) -> Iter<'_, String, PropertyValue> {
        self.properties.iter()
    }

    pub fn clear(&mut self) {
        self.properties.clear();
    }

    /// The number of pixels along each axis
    pub fn dimensions(&self) -> [u64; 3] {
        [
            self.get_unsigned(keys::MAX_COUNT_OF_PIXEL_X).unwrap_or_default(),
            self.get_unsigned(keys::MAX_COUNT_OF_PIXEL_Y).unwrap_or_default(),
            self.get_unsigned(keys::MAX_COUNT_OF_PIXEL_Z).unwrap_or(1),
        ]
    }

    /// The pixel spacing along each axis in millimeters
    pub fn pixel_size(&self) -> [f64; 3] {
        [
            self.get_double(keys::PIXEL_SIZE_X).unwrap_or(-1.0),
            self.get_double(keys::PIXEL_SIZE_Y).unwrap_or(-1.0),
            self.get_double(keys::PIXEL_SIZE_Z).unwrap_or(-1.0),
        ]
    }

    /// The world position of the first pixel in millimeters
    pub fn origin(&self) -> [f64; 3] {
        [
            self.get_double(keys::ORIGIN_X).unwrap_or_default(),
            self.get_double(keys::ORIGIN_Y).unwrap_or_default(),
            self.get_double(keys::ORIGIN_Z).unwrap_or_default(),
        ]
    }

    pub fn number_of_measurements(&self) -> Option<u64> {
        self.get_unsigned(keys::NUMBER_OF_MEASUREMENTS)
    }

    /// Whether the parser had to substitute default pixel sizes
    pub fn has_default_pixel_size(&self) -> bool {
        self.has_property(keys::PIXEL_SIZE_INFO)
    }
}

impl PropertyStore for ImageMetadata {
    fn set_property<K: Into<String>, V: Into<PropertyValue>>(&mut self, name: K, value: V) {
        self.properties.insert(name.into(), value.into());
    }

    fn get_property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.shift_remove(name)
    }
}
