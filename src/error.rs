//! A custom error and result type used across the crate

use core::fmt;
use core::result;
use std::error;
use std::io;

#[derive(Debug)]
/// A custom patching error
pub enum Error {
    /// The input does not begin with the ELF magic
    BadMagic(u64),
    /// The binary is malformed in some way, or an edit cannot be placed in it
    Malformed(String),
    /// An error emanating from reading or writing wire structures
    Scroll(scroll::Error),
    /// An IO based error
    IO(io::Error),
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IO(ref io) => Some(io),
            Error::Scroll(ref scroll) => Some(scroll),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IO(err)
    }
}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Error {
        Error::Scroll(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::BadMagic(magic) => write!(fmt, "Invalid magic number: 0x{:x}", magic),
            Error::Malformed(ref msg) => write!(fmt, "Malformed entity: {}", msg),
            Error::Scroll(ref err) => write!(fmt, "{}", err),
            Error::IO(ref err) => write!(fmt, "{}", err),
        }
    }
}

/// An impish result to patch your ELF troubles with
pub type Result<T> = result::Result<T, Error>;
