// ============================================================================
// ERROR TYPE — one taxonomy for every failing call in the engine
// ============================================================================

/// Error type for graph, layer, codec and script operations.
///
/// Validation failures are always [`Error::InvalidArgument`]. The remaining
/// variants carry the source of a collaborator failure (file system, image
/// codec, manifest serialization) so the shell can report it verbatim.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Out-of-range value, unknown or duplicate name, bad token, bad arity.
    #[error("{0}")]
    InvalidArgument(String),

    /// File system error while reading or writing an image.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The `image` crate could not decode or encode a raster.
    #[error("codec error: {0}")]
    Codec(#[from] image::ImageError),

    /// A layered-image manifest could not be serialized or deserialized.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Shorthand used at every validation site.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        Error::Persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fail with `InvalidArgument` unless `cond` holds.
macro_rules! ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::InvalidArgument(format!($($arg)*)));
        }
    };
}

pub(crate) use ensure;

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(v: i32) -> Result<i32> {
        ensure!(v >= 0, "value {} is negative", v);
        Ok(v)
    }

    #[test]
    fn ensure_reports_invalid_argument() {
        let err = checked(-3).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "value -3 is negative");
        assert_eq!(checked(4).unwrap(), 4);
    }

    #[test]
    fn io_errors_are_not_invalid_argument() {
        let err: Error = std::io::Error::other("disk gone").into();
        assert!(!err.is_invalid_argument());
        assert!(err.to_string().contains("disk gone"));
    }
}
