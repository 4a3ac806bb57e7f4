//! Detector configuration.

use serde::{Deserialize, Serialize};

use crate::lang::Language;

/// Default directory patterns excluded from file discovery: dependency
/// trees, build output, and VCS metadata repeat verbatim across projects
/// and would swamp the clone index.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/__pycache__/**",
    "**/venv/**",
    "**/.git/**",
    "**/_deps/**",
    "**/build/**",
    "**/cmake-build-*/**",
    "**/vcpkg_installed/**",
    "**/third_party/**",
    "**/vendor/**",
    "**/external/**",
];

/// Configuration for the similarity detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Rolling hash window size in tokens.
    pub window_size: usize,

    /// Minimum tokens for a region to be reported as a clone.
    pub min_clone_tokens: usize,

    /// Minimum similarity accepted when extending Type-3 clones.
    pub similarity_threshold: f32,

    /// Index normalized hashes so renamed code still collides (Type-2).
    pub detect_type2: bool,

    /// Run the seed-and-extend engine for near-miss clones (Type-3).
    pub detect_type3: bool,

    /// Gap budget (in tokens) during Type-3 extension.
    pub max_gap_tokens: usize,

    /// Worker threads; 0 selects the platform parallelism (fallback 4).
    pub num_threads: usize,

    /// File extensions to analyze (with leading dot).
    pub extensions: Vec<String>,

    /// Glob patterns excluded from file discovery.
    pub exclude_patterns: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_clone_tokens: 30,
            similarity_threshold: 0.7,
            detect_type2: true,
            detect_type3: false,
            max_gap_tokens: 5,
            num_threads: 0,
            extensions: Language::all_extensions()
                .into_iter()
                .map(String::from)
                .collect(),
            exclude_patterns: DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl DetectorConfig {
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    #[must_use]
    pub fn with_min_clone_tokens(mut self, min_clone_tokens: usize) -> Self {
        self.min_clone_tokens = min_clone_tokens;
        self
    }

    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_type2(mut self, enabled: bool) -> Self {
        self.detect_type2 = enabled;
        self
    }

    #[must_use]
    pub fn with_type3(mut self, enabled: bool) -> Self {
        self.detect_type3 = enabled;
        self
    }

    #[must_use]
    pub fn with_max_gap(mut self, max_gap_tokens: usize) -> Self {
        self.max_gap_tokens = max_gap_tokens;
        self
    }

    #[must_use]
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }
}
