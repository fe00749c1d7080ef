//! Error types for deck assembly.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, cloning, or writing slide packages.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The input format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    XmlError(String),

    /// A pack URI was malformed.
    #[error("Invalid part name: {0}")]
    InvalidPartName(String),

    /// The package is missing something every presentation must have.
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// A requested part does not exist in the package.
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// A shape or relationship in a source package could not be resolved.
    #[error("Structural error: {0}")]
    Structural(String),

    /// A linked external resource could not be fetched.
    #[error("Resource fetch error: {0}")]
    ResourceFetch(String),

    /// The package would be written with a dangling reference.
    #[error("Package integrity error: {0}")]
    PackageIntegrity(String),
}

impl Error {
    /// Whether the error is confined to a single shape or relationship and
    /// can be recovered from by skipping or degrading that item.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Structural(_) | Error::ResourceFetch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::Structural("rId9".into()).is_recoverable());
        assert!(Error::ResourceFetch("http://x".into()).is_recoverable());
        assert!(!Error::PackageIntegrity("dangling".into()).is_recoverable());
        assert!(!Error::ZipError("bad".into()).is_recoverable());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = Error::PackageIntegrity("/ppt/slides/slide3.xml -> rId4".into());
        assert_eq!(
            err.to_string(),
            "Package integrity error: /ppt/slides/slide3.xml -> rId4"
        );
    }
}
