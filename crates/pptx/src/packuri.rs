//! Part names within a package.

use deck_core::{Error, Result};
use std::fmt;

/// An absolute part name, e.g. `/ppt/slides/slide1.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackUri {
    uri: String,
}

/// The package pseudo-partname.
pub const PACKAGE_URI: &str = "/";

/// The content types part, which is not a part in its own right.
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

impl PackUri {
    /// Create a part name. It must begin with a forward slash.
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(Error::InvalidPartName(format!(
                "Part name must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(Self { uri })
    }

    /// Part name for a zip member name (which has no leading slash).
    pub fn from_member_name(name: &str) -> Result<Self> {
        Self::new(format!("/{}", name.trim_start_matches('/')))
    }

    /// Resolve a relative reference (such as `../media/image1.png`) against a
    /// base directory (such as `/ppt/slides`).
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };
        Self::new(normalize_path(&joined))
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Directory portion, e.g. `/ppt/slides` for `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// File name portion, e.g. `slide1.xml`.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Extension without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Numeric index of a tuple part name, e.g. 21 for `slide21.xml`.
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
        let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 || digits == stem.len() {
            return None;
        }
        stem[stem.len() - digits..].parse().ok()
    }

    /// Zip member name (part name without the leading slash).
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Reference to this part relative to a base directory.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = vec![".."; from_parts.len() - common];
        segments.extend(&to_parts[common..]);
        segments.join("/")
    }

    /// Part name of the relationships part for this part.
    pub fn rels_uri(&self) -> PackUri {
        let base = self.base_uri();
        let uri = if self.uri == PACKAGE_URI {
            "/_rels/.rels".to_string()
        } else if base == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", base, self.filename())
        };
        PackUri { uri }
    }

    /// The source part of a relationships part name, or None if `self` is
    /// not a `.rels` part.
    pub fn rels_source(&self) -> Option<PackUri> {
        let filename = self.filename().strip_suffix(".rels")?;
        let dir = self.base_uri().strip_suffix("/_rels")?;
        if filename.is_empty() {
            return Some(PackUri {
                uri: PACKAGE_URI.to_string(),
            });
        }
        Some(PackUri {
            uri: format!("{}/{}", dir, filename),
        })
    }
}

impl fmt::Display for PackUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackUri {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// Resolve `.` and `..` segments of an absolute path.
fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_leading_slash() {
        assert!(PackUri::new("ppt/slides/slide1.xml").is_err());
        assert!(PackUri::new("/ppt/slides/slide1.xml").is_ok());
    }

    #[test]
    fn test_components() {
        let uri = PackUri::new("/ppt/slides/slide21.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");
        assert_eq!(uri.filename(), "slide21.xml");
        assert_eq!(uri.ext(), "xml");
        assert_eq!(uri.idx(), Some(21));
        assert_eq!(uri.membername(), "ppt/slides/slide21.xml");

        let single = PackUri::new("/ppt/presentation.xml").unwrap();
        assert_eq!(single.idx(), None);
        assert_eq!(PackUri::new("/ppt/media/42.png").unwrap().idx(), None);
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackUri::from_rel_ref("/ppt/slides", "../media/image1.png").unwrap();
        assert_eq!(uri.as_str(), "/ppt/media/image1.png");

        let uri = PackUri::from_rel_ref("/ppt", "slides/slide1.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slides/slide1.xml");

        let uri = PackUri::from_rel_ref("/", "ppt/presentation.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/presentation.xml");

        let uri = PackUri::from_rel_ref("/ppt/slides", "/ppt/media/a.png").unwrap();
        assert_eq!(uri.as_str(), "/ppt/media/a.png");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackUri::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.relative_ref("/ppt/slides"), "../slideLayouts/slideLayout1.xml");
        assert_eq!(uri.relative_ref("/ppt"), "slideLayouts/slideLayout1.xml");
        assert_eq!(uri.relative_ref("/"), "ppt/slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn test_rels_uri_and_source() {
        let uri = PackUri::new("/ppt/slides/slide1.xml").unwrap();
        let rels = uri.rels_uri();
        assert_eq!(rels.as_str(), "/ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels.rels_source(), Some(uri));

        let pkg = PackUri::new(PACKAGE_URI).unwrap();
        assert_eq!(pkg.rels_uri().as_str(), "/_rels/.rels");
        assert_eq!(pkg.rels_uri().rels_source(), Some(pkg));

        let root_part = PackUri::new("/other.xml").unwrap();
        assert_eq!(root_part.rels_uri().as_str(), "/_rels/other.xml.rels");
        assert_eq!(root_part.rels_uri().rels_source(), Some(root_part));

        assert_eq!(PackUri::new("/ppt/slides/slide1.xml").unwrap().rels_source(), None);
    }
}
