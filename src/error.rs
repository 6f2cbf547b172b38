use thiserror::Error;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("Container parse error: {err}")]
    Perm {
        #[from]
        err: crate::perm::PermError,
    },
    #[error("Cursor error: {err}")]
    Cursor {
        #[from]
        err: crate::data::cursor::CursorError,
    },
    #[cfg(feature = "json")]
    #[error("Error serializing or deserializing json: {err}")]
    SerdeJson {
        #[from]
        err: serde_json::Error,
    },
    #[error("IO error")]
    IoError(#[from] std::io::Error),
}

impl From<crate::perm::PermError> for Error {
    fn from(x: crate::perm::PermError) -> Error {
        Error { kind: x.into() }
    }
}

impl From<crate::data::cursor::CursorError> for Error {
    fn from(x: crate::data::cursor::CursorError) -> Error {
        Error { kind: x.into() }
    }
}

impl From<std::io::Error> for Error {
    fn from(x: std::io::Error) -> Error {
        Error { kind: x.into() }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(x: serde_json::Error) -> Error {
        Error { kind: x.into() }
    }
}

pub type IResult<T> = Result<T, Error>;

pub fn failure_from_kind(kind: ErrorKind) -> Error {
    Error { kind }
}
