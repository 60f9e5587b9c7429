//! Source locations.
//!
//! A `Location` names a point in a source file by path, 1-based line, and
//! 1-based column. Locations are non-semantic: two identifiers with the
//! same name compare equal regardless of where they were written.

use std::fmt;

use serde::Serialize;

/// A point in a source file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    /// Path of the source file, as handed to the parser.
    pub path: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub col: u32,
}

impl Location {
    pub fn new(path: impl Into<String>, line: u32, col: u32) -> Self {
        Location { path: path.into(), line, col }
    }

    /// A location for compiler-synthesized nodes with no source position.
    pub fn internal() -> Self {
        Location { path: "<internal>".to_string(), line: 0, col: 0 }
    }

    /// Whether this location was synthesized by the compiler.
    pub fn is_internal(&self) -> bool {
        self.line == 0
    }

    /// Byte offset of this location within `source`.
    ///
    /// Used when rendering diagnostics against the original text. Returns
    /// the end of the source if the line/column falls outside it.
    pub fn byte_offset(&self, source: &str) -> usize {
        if self.is_internal() {
            return 0;
        }
        let mut line = 1u32;
        let mut col = 1u32;
        for (offset, ch) in source.char_indices() {
            if line == self.line && col == self.col {
                return offset;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        source.len()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.col)
    }
}
