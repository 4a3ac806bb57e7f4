//! simscan - token-based source code clone detection.
//!
//! Finds duplicated regions across (and within) source files and classifies
//! them:
//!
//! - **Type-1**: exact copies, ignoring whitespace and comments
//! - **Type-2**: identical structure with renamed identifiers/literals
//! - **Type-3**: near-misses with a bounded number of edits
//!
//! # How it works
//!
//! Source text is lexed into normalized tokens carrying two hashes: one of
//! the exact lexeme, one that collapses every identifier (and string,
//! number, type name) onto a per-category placeholder. A Rabin-Karp
//! rolling hash indexes every k-token window of the placeholder stream;
//! windows sharing a hash become clone seeds. Seeds are merged into
//! maximal regions, classified by comparing exact-lexeme hashes, and
//! (optionally) grown across small edits by a gap-tolerant extension pass.
//!
//! # Example
//!
//! ```no_run
//! use simscan::{DetectorConfig, SimilarityDetector};
//!
//! let config = DetectorConfig::default()
//!     .with_min_clone_tokens(30)
//!     .with_type3(true);
//! let detector = SimilarityDetector::new(config);
//!
//! let report = detector.analyze(std::path::Path::new("./src"))?;
//! println!("{} clone pairs", report.summary.clone_pairs_found);
//! for clone in &report.clones {
//!     println!("{} [{}]", clone.id, clone.clone_type);
//! }
//! # Ok::<(), simscan::SimscanError>(())
//! ```
//!
//! Supported languages: Python, JavaScript/TypeScript, and C/C++.

pub mod cache;
pub mod config;
pub mod detect;
pub mod error;
pub mod extend;
pub mod index;
pub mod lang;
pub mod report;
pub mod scan;
pub mod token;

pub use cache::{CacheStats, TokenCache};
pub use config::DetectorConfig;
pub use detect::SimilarityDetector;
pub use error::{Result, SimscanError};
pub use extend::{alignment_similarity, jaccard_similarity, CloneExtender, ExtendConfig};
pub use index::rolling::RollingHash;
pub use index::{ClonePair, CloneType, HashIndex, HashIndexBuilder, HashLocation};
pub use lang::Language;
pub use report::{render_text, SimilarityReport};
pub use token::{NormalizedToken, TokenType, TokenizedFile};

use std::path::Path;

/// One-call clone detection over a directory with an optional custom
/// configuration.
pub fn detect_clones(root: impl AsRef<Path>, config: Option<DetectorConfig>) -> Result<SimilarityReport> {
    let detector = SimilarityDetector::new(config.unwrap_or_default());
    detector.analyze(root.as_ref())
}
