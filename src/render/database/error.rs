use std::fmt;

use super::ResourceType;

/// A convenient result type wrapping [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct LookupError {
    pub entry: String,
}

#[derive(Debug)]
pub struct LoadingError {
    pub entry: String,
    pub path: String,
}

#[derive(Debug)]
pub struct DuplicateError {
    pub kind: ResourceType,
    pub entry: String,
}

#[derive(Debug)]
pub struct GeometryError {
    pub reason: String,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not find requested entry {} in database!",
            self.entry
        )
    }
}

impl fmt::Display for LoadingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to load requested entry {} in database! Attempted path: {}",
            self.entry, self.path
        )
    }
}

impl fmt::Display for DuplicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} resource {} is already registered in database!",
            self.kind, self.entry
        )
    }
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed geometry data: {}", self.reason)
    }
}

impl std::error::Error for LookupError {}

impl std::error::Error for LoadingError {}

impl std::error::Error for DuplicateError {}

impl std::error::Error for GeometryError {}

#[derive(Debug)]
pub enum Error {
    LookupError(LookupError),
    LoadingError(LoadingError),
    DuplicateError(DuplicateError),
    GeometryError(GeometryError),
}

impl Error {
    pub(crate) fn lookup(entry: impl Into<String>) -> Self {
        Error::LookupError(LookupError {
            entry: entry.into(),
        })
    }

    pub(crate) fn geometry(reason: impl Into<String>) -> Self {
        Error::GeometryError(GeometryError {
            reason: reason.into(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LookupError(err) => err.fmt(f),
            Error::LoadingError(err) => err.fmt(f),
            Error::DuplicateError(err) => err.fmt(f),
            Error::GeometryError(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::LookupError(err) => Some(err),
            Error::LoadingError(err) => Some(err),
            Error::DuplicateError(err) => Some(err),
            Error::GeometryError(err) => Some(err),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(value: image::ImageError) -> Self {
        return Error::LoadingError(LoadingError {
            entry: "[UNKNOWN]".to_string(),
            path: value.to_string(),
        });
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        return Error::LoadingError(LoadingError {
            entry: "IO Loading Error".to_string(),
            path: value.to_string(),
        });
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        return Error::LoadingError(LoadingError {
            entry: "JSON FILE".to_string(),
            path: value.to_string(),
        });
    }
}
