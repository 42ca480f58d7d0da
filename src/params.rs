//! A typed key/value property store for image-level metadata.
//!
//! The image container that ultimately owns a dataset's metadata is not part of
//! this crate; parsers only require something implementing [`PropertyStore`].
//! [`ImageMetadata`](crate::meta::ImageMetadata) is the default implementation.
use std::fmt::Display;
use std::str;

/// A single property value. Values captured verbatim from the document are
/// stored as [`PropertyValue::Text`], recognised terms are stored typed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    Text(String),
    Unsigned(u64),
    Double(f64),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as a floating point number. Unsigned values are
    /// widened and text is parsed, so a property captured generically from the
    /// document can still be used as a number.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Unsigned(v) => Some(*v as f64),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn coerce<T: str::FromStr>(&self) -> Result<T, T::Err> {
        self.to_string().trim().parse::<T>()
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(v) => f.write_str(v),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Unsigned(value as u64)
    }
}

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        Self::Unsigned(value as u64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// The interface a metadata container must offer to be populated by the imzML
/// parser: typed `set`, `get` and `remove` keyed by name.
pub trait PropertyStore {
    fn set_property<K: Into<String>, V: Into<PropertyValue>>(&mut self, name: K, value: V);

    fn get_property(&self, name: &str) -> Option<&PropertyValue>;

    fn remove_property(&mut self, name: &str) -> Option<PropertyValue>;

    fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }

    fn get_text(&self, name: &str) -> Option<&str> {
        self.get_property(name).and_then(|v| v.as_str())
    }

    fn get_unsigned(&self, name: &str) -> Option<u64> {
        self.get_property(name).and_then(|v| v.as_unsigned())
    }

    fn get_double(&self, name: &str) -> Option<f64> {
        self.get_property(name).and_then(|v| v.as_double())
    }

    fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_property(name).and_then(|v| v.as_bool())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_value_coercion() {
        let v = PropertyValue::Text(" 12.5 ".into());
        assert_eq!(v.as_double(), Some(12.5));
        assert_eq!(v.as_unsigned(), None);
        assert_eq!(v.as_str(), Some(" 12.5 "));

        let v = PropertyValue::Unsigned(3);
        assert_eq!(v.as_double(), Some(3.0));
        assert_eq!(v.as_str(), None);

        let v = PropertyValue::Bool(true);
        assert_eq!(v.as_double(), None);
        assert_eq!(v.coerce::<bool>(), Ok(true));
    }
}
