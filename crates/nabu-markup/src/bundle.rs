//! Loading a microapp's markup files from a directory.
//!
//! Layout:
//!
//! ```text
//! <dir>/microapp.xml
//! <dir>/styles.xml
//! <dir>/queries.xml
//! <dir>/screens/*.xml
//! ```
//!
//! Each top-level file is optional; a missing file parses as an empty
//! section. Reading is blocking and meant to run off the UI thread.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BundleError;
use crate::model::Document;
use crate::parser::{ParseReport, parse_with_report};

/// The raw markup sources of one microapp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupBundle {
    pub microapp: String,
    pub styles: String,
    pub queries: String,
    /// `(file name, markup)`, sorted by file name.
    pub screens: Vec<(String, String)>,
}

impl MarkupBundle {
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, BundleError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(BundleError::NotADirectory(dir.to_path_buf()));
        }

        let mut bundle = Self {
            microapp: read_optional(&dir.join("microapp.xml"))?,
            styles: read_optional(&dir.join("styles.xml"))?,
            queries: read_optional(&dir.join("queries.xml"))?,
            screens: Vec::new(),
        };

        let screens_dir = dir.join("screens");
        if screens_dir.is_dir() {
            let entries = fs::read_dir(&screens_dir).map_err(|e| io_error(&screens_dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| io_error(&screens_dir, e))?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("xml") {
                    continue;
                }
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let src = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
                bundle.screens.push((name, src));
            }
        }
        bundle.screens.sort_by(|a, b| a.0.cmp(&b.0));

        log::debug!("loaded bundle {} with {} screen files", dir.display(), bundle.screens.len());
        Ok(bundle)
    }

    pub fn parse(&self) -> Document {
        self.parse_with_report().0
    }

    pub fn parse_with_report(&self) -> (Document, ParseReport) {
        parse_with_report(&self.microapp, &self.styles, &self.queries, &self.screens)
    }
}

fn read_optional(path: &Path) -> Result<String, BundleError> {
    match fs::read_to_string(path) {
        Ok(src) => Ok(src),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(io_error(path, e)),
    }
}

fn io_error(path: &Path, source: io::Error) -> BundleError {
    BundleError::Io { path: PathBuf::from(path), source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_sorted_screens_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("microapp.xml"), r#"<microapp title="T" code="t"/>"#).unwrap();
        fs::create_dir(dir.path().join("screens")).unwrap();
        fs::write(dir.path().join("screens/b.xml"), r#"<screen code="b"/>"#).unwrap();
        fs::write(dir.path().join("screens/a.xml"), r#"<screen code="a"/>"#).unwrap();
        fs::write(dir.path().join("screens/notes.txt"), "ignore me").unwrap();

        let bundle = MarkupBundle::load_dir(dir.path()).unwrap();
        let names: Vec<_> = bundle.screens.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a.xml", "b.xml"]);
        assert!(bundle.styles.is_empty());

        let doc = bundle.parse();
        assert_eq!(doc.microapp_code(), "t");
        assert_eq!(doc.screens.len(), 2);
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = MarkupBundle::load_dir(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, BundleError::NotADirectory(_)));
    }
}
