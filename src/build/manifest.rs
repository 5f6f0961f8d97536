//! Build manifest parsing
//!
//! The packaging tool prints one produced path per line, e.g.
//! `.out/demo@1.2.0/demo@1.2.0.zip`. The artifact's file name is the last
//! path segment of a line that contains `out/` after at least one other
//! character and has another `/` after that.

use crate::error::{PackyardError, PackyardResult};

const OUT_MARKER: &str = "out/";

/// Extract the artifact file name from a manifest line (or request path).
///
/// Returns `None` when the line does not match `<c>out/<segment>/<name>` or
/// the name would be empty.
pub fn extract_file_name(line: &str) -> Option<&str> {
    let line = line.trim();
    let first = line.chars().next()?.len_utf8();
    let marker = line[first..].find(OUT_MARKER)? + first;
    let after_marker = &line[marker + OUT_MARKER.len()..];

    let last_slash = after_marker.rfind('/')?;
    let name = &after_marker[last_slash + 1..];
    (!name.is_empty()).then_some(name)
}

/// Raw output of one packaging run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
    text: String,
}

impl BuildManifest {
    /// Parse fresh tool output. Every non-empty line must name an artifact.
    pub fn parse(output: &str) -> PackyardResult<Self> {
        let manifest = Self::from_stored(output.trim());
        for line in manifest.lines() {
            if extract_file_name(line).is_none() {
                return Err(PackyardError::ManifestLine(line.to_string()));
            }
        }
        Ok(manifest)
    }

    /// Wrap manifest text read back from the store, unvalidated
    pub fn from_stored(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Manifest text as stored
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Non-empty, trimmed lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }

    /// (line, file name) for every line that names an artifact
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines()
            .filter_map(|line| extract_file_name(line).map(|name| (line, name)))
    }

    /// Whether any line names `file_name`
    pub fn lists(&self, file_name: &str) -> bool {
        self.entries().any(|(_, name)| name == file_name)
    }

    /// File name of the primary artifact: taken from the smallest line in
    /// byte order, so tool output order never changes the answer.
    pub fn primary_file_name(&self) -> Option<&str> {
        self.lines().min().and_then(extract_file_name)
    }
}
