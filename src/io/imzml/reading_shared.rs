use std::io;
use std::str::FromStr;

use thiserror::Error;

/**
The different states the imzML parser can enter while scanning different
phases of the document. This information is really only needed by the module
consumer to determine where in the document an error occurred.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub enum ImzMLParserState {
    Start = 0,

    // Pass one, everything before `<run>`
    Header,
    ReferenceableParamGroup,

    // Pass two
    Run,
    SpectrumList,
    Spectrum,
    SpectrumListDone,
}

/**
All the ways that imzML metadata parsing can go wrong
*/
#[derive(Debug, Error)]
pub enum ImzMLParserError {
    #[error("Malformed numeric value {value:?} for {attribute:?} on line {line_number} in {state:?}: {line}")]
    MalformedNumber {
        state: ImzMLParserState,
        line_number: usize,
        attribute: &'static str,
        value: String,
        line: String,
    },
    #[error("The property {name:?} holds {value:?}, which is not a number")]
    MalformedProperty { name: String, value: String },
    #[error("Pixel coordinate {value} on line {line_number} is not a 1-based index: {line}")]
    InvalidCoordinate {
        line_number: usize,
        value: u64,
        line: String,
    },
    #[error("The spectrum list declared {declared} spectra but {found} were found")]
    SpectrumCountMismatch { declared: usize, found: usize },
    #[error("The document does not contain a spectrumList element")]
    MissingSpectrumList,
    #[error("No referenceable param group describes the {0}")]
    MissingArrayGroup(&'static str),
    #[error("Spectrum {spectrum} ending on line {line_number} does not locate its {array}")]
    MissingArrayLocation {
        spectrum: usize,
        array: &'static str,
        line_number: usize,
    },
    #[error("An IO error {1} was encountered in {0:?}")]
    IOError(ImzMLParserState, #[source] io::Error),
}

impl From<ImzMLParserError> for io::Error {
    fn from(value: ImzMLParserError) -> Self {
        match value {
            ImzMLParserError::IOError(_, ref e) => io::Error::new(e.kind(), value),
            _ => io::Error::new(io::ErrorKind::InvalidData, value),
        }
    }
}

pub type ParserResult<T = ()> = Result<T, ImzMLParserError>;

/// Parse a numeric attribute value, reporting where in the document it came from
/// on failure.
pub(crate) fn parse_number<T: FromStr>(
    value: &str,
    attribute: &'static str,
    line: &str,
    line_number: usize,
    state: ImzMLParserState,
) -> ParserResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ImzMLParserError::MalformedNumber {
            state,
            line_number,
            attribute,
            value: value.to_string(),
            line: line.trim().to_string(),
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_number() {
        let v: u64 = parse_number(
            " 42 ",
            "value",
            "<cvParam value=\" 42 \"/>",
            3,
            ImzMLParserState::Header,
        )
        .unwrap();
        assert_eq!(v, 42);

        let err = parse_number::<f64>(
            "1O.5",
            "value",
            "<x value=\"1O.5\"/>",
            7,
            ImzMLParserState::Spectrum,
        )
        .unwrap_err();
        match &err {
            ImzMLParserError::MalformedNumber {
                line_number,
                value,
                state,
                ..
            } => {
                assert_eq!(*line_number, 7);
                assert_eq!(value, "1O.5");
                assert_eq!(*state, ImzMLParserState::Spectrum);
            }
            e => panic!("Unexpected error {e}"),
        }
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
    }
}
