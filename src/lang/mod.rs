//! Supported languages and tokenizer dispatch.
//!
//! Languages are a closed set, so dispatch is a plain enum match rather
//! than a trait-object registry: tokenizers are cheap to run (their
//! keyword tables are static) and hold no state between calls.

pub mod cpp;
pub mod python;
pub mod typescript;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::token::TokenizedFile;

/// A source language with a tokenizer.
///
/// JavaScript and TypeScript share one tokenizer (TypeScript keywords are a
/// superset); C and C++ likewise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    C,
    Cpp,
}

impl Language {
    /// Detect the language from a file extension (with or without the
    /// leading dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        match ext {
            "py" | "pyw" | "pyi" => Some(Self::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            "c" => Some(Self::C),
            "cpp" | "cxx" | "cc" | "hpp" | "hxx" | "h" => Some(Self::Cpp),
            _ => None,
        }
    }

    /// Detect the language from a file path's extension.
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::C => "C",
            Self::Cpp => "C++",
        }
    }

    /// File extensions claimed by this language.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Python => &[".py", ".pyw", ".pyi"],
            Self::JavaScript => &[".js", ".mjs", ".cjs", ".jsx"],
            Self::TypeScript => &[".ts", ".tsx"],
            Self::C => &[".c"],
            Self::Cpp => &[".cpp", ".cxx", ".cc", ".hpp", ".hxx", ".h"],
        }
    }

    /// Every extension any supported language claims.
    #[must_use]
    pub fn all_extensions() -> Vec<&'static str> {
        [
            Self::Python,
            Self::JavaScript,
            Self::TypeScript,
            Self::C,
            Self::Cpp,
        ]
        .iter()
        .flat_map(|l| l.extensions().iter().copied())
        .collect()
    }

    /// Tokenize and normalize source text.
    ///
    /// Tokenizers are total functions: malformed input never fails, and the
    /// result for a given input is always identical.
    #[must_use]
    pub fn tokenize(self, source: &str) -> TokenizedFile {
        match self {
            Self::Python => python::tokenize(source),
            Self::JavaScript | Self::TypeScript => typescript::tokenize(source),
            Self::C | Self::Cpp => cpp::tokenize(source),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension(".py"), Some(Language::Python));
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension(".ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension(".mjs"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension(".hpp"), Some(Language::Cpp));
        assert_eq!(Language::from_extension(".c"), Some(Language::C));
        assert_eq!(Language::from_extension(".rb"), None);
    }

    #[test]
    fn test_detect_from_path() {
        assert_eq!(
            Language::detect(Path::new("src/app/main.py")),
            Some(Language::Python)
        );
        assert_eq!(
            Language::detect(Path::new("lib/util.test.ts")),
            Some(Language::TypeScript)
        );
        assert_eq!(Language::detect(Path::new("README.md")), None);
        assert_eq!(Language::detect(Path::new("Makefile")), None);
    }

    #[test]
    fn test_all_extensions_unique() {
        let exts = Language::all_extensions();
        let mut deduped = exts.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(exts.len(), deduped.len());
    }
}
