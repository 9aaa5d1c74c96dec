use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Not an ACG scene file (magic \"{}\")", .0.escape_ascii())]
    BadMagic([u8; 4]),

    #[error("Unsupported ACG scene version {found} (this decoder reads version {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("ACG scene stream ended before a declared count or length was satisfied")]
    Truncated,

    #[error("ACG scene string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("Field of {0} elements does not fit a u32 length prefix")]
    TooLong(usize),

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => FormatError::Truncated,
            _ => FormatError::Io(e),
        }
    }
}
