use core::fmt;
use std::{error, io, result};

/// Internally, we only use this Error type and a newtype wrapper around `std::result::Result<T, E>`
/// where `E` is fixed. Everything that can go wrong while loading an index or reading input ends
/// up here. Search outcomes are never errors; an unaligned read simply yields no alignments.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    InvalidIndex(String),
    IndexVersionMismatch { running: u8, on_disk: u8 },
    ParseError(String),
}

impl fmt::Display for Error {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::InvalidIndex(err) => write!(f, "Index is invalid: {}", err),
            Error::IndexVersionMismatch { running, on_disk } => write!(
                f,
                "The provided index (version {}) is incompatible with version {} of {}. Please re-create the index.",
                on_disk,
                running,
                crate::CRATE_NAME
            ),
            Error::ParseError(err) => write!(f, "Could not parse input: {}", err),
        }
    }
}

impl From<io::Error> for Error {
    #[cold]
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<bincode::Error> for Error {
    #[cold]
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Error::InvalidIndex("Index file is truncated".to_string())
            }
            bincode::ErrorKind::Io(e) => Error::Io(e),
            _ => Error::InvalidIndex("Invalid encoding".to_string()),
        }
    }
}

impl From<bio::io::fastq::Error> for Error {
    #[cold]
    fn from(e: bio::io::fastq::Error) -> Self {
        Error::ParseError(e.to_string())
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;
