use std::{
    error,
    io,
    num::{ParseFloatError, ParseIntError},
};

use derive_more::{Display, From};
use quick_xml::events::attributes::AttrError;

/// An error that can occur while turning a byte stream into an [XmlTree](super::XmlTree),
/// or while writing one back out.
#[derive(Debug, From, Display)]
pub enum XmlError {
    /// Something went wrong with stdlib IO.
    IoError(io::Error),
    /// The underlying reader rejected the document.
    ReaderError(quick_xml::Error),
    /// An attribute could not be read
    AttributeError(AttrError),
    /// We found a problem with the document structure
    #[display("malformed document: {_0}")]
    Malformed(&'static str),
}

impl error::Error for XmlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::ReaderError(err) => Some(err),
            Self::AttributeError(err) => Some(err),
            Self::Malformed(_) => None,
        }
    }
}

/// An error that can occur when compiling a [SearchPattern](super::SearchPattern).
#[derive(Debug, Display)]
pub enum PatternError {
    #[display("search pattern is empty")]
    Empty,
    #[display("absolute search patterns are not supported: {_0}")]
    Absolute(String),
    #[display("invalid step {step:?} in search pattern {pattern}")]
    InvalidStep { pattern: String, step: String },
    #[display("invalid predicate {predicate:?} in search pattern {pattern}")]
    InvalidPredicate { pattern: String, predicate: String },
}

impl error::Error for PatternError {}

/// An error that occurred somewhere within the extraction of records from a
/// parsed tree.
#[derive(Debug, Display)]
pub enum ParsingError {
    PatternError(PatternError),
    /// An element every save is expected to have is not there
    #[display("required element {_0} is missing")]
    MissingElement(&'static str),
    /// A record was found, but the field identifying it is not there
    #[display("{record} record is missing its identity field {pattern}")]
    MissingIdentity {
        record: &'static str,
        pattern: &'static str,
    },
    /// The three parallel mod lists disagree in length
    #[display("mod lists have different lengths: {ids} ids, {steam_ids} steam ids, {names} names")]
    MismatchedModLists {
        ids: usize,
        steam_ids: usize,
        names: usize,
    },
    #[display("failed converting {field}={value:?} to an integer: {source}")]
    IntegerError {
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[display("failed converting {field}={value:?} to a real number: {source}")]
    RealError {
        field: &'static str,
        value: String,
        source: ParseFloatError,
    },
}

impl From<PatternError> for ParsingError {
    fn from(value: PatternError) -> Self {
        ParsingError::PatternError(value)
    }
}

impl error::Error for ParsingError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::PatternError(err) => Some(err),
            Self::IntegerError { source, .. } => Some(source),
            Self::RealError { source, .. } => Some(source),
            _ => None,
        }
    }
}
