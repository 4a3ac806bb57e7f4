//! Inverted rolling-hash index and clone pair extraction.
//!
//! The index maps every k-window hash to the locations it occurred at.
//! Clone detection then reduces to finding hashes with more than one
//! location:
//!
//! 1. [`HashIndexBuilder`] strips structural tokens from each file and
//!    inserts every k-window of the remaining sequence.
//! 2. [`HashIndex::find_clone_pairs`] emits every unordered pair of
//!    locations sharing a hash, suppressing same-file overlaps.
//! 3. [`HashIndex::merge_adjacent_clones`] coalesces runs of neighbouring
//!    window pairs into single clone regions.
//! 4. [`HashIndex::filter_by_size`] drops regions below the configured
//!    minimum.
//!
//! Token coordinates (`token_start`, `token_count`) index the *significant*
//! token sequence of a file (structural newline/indent/dedent tokens
//! removed); see [`TokenizedFile::significant`]. Line and column fields
//! always refer to real source positions.

pub mod rolling;

use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::token::TokenizedFile;

/// Minimum number of duplicate hashes before pair enumeration goes
/// parallel; below this the partitioning overhead dominates.
const MIN_HASHES_FOR_PARALLEL: usize = 100;

// =============================================================================
// TYPES
// =============================================================================

/// Clone classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneType {
    /// Exact copy (ignoring whitespace/comments).
    Type1,
    /// Renamed identifiers/literals.
    Type2,
    /// Near-miss with bounded insertions/deletions/edits.
    Type3,
}

impl CloneType {
    /// Display form used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Type1 => "Type-1",
            Self::Type2 => "Type-2",
            Self::Type3 => "Type-3",
        }
    }
}

impl std::fmt::Display for CloneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A region of source occupied by one (possibly extended) token window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashLocation {
    /// Dense index into the file table.
    pub file_id: u32,
    /// 1-based first source line.
    pub start_line: u32,
    /// 1-based last source line.
    pub end_line: u32,
    /// 1-based column of the first token.
    pub start_col: u32,
    /// Column one past the last token.
    pub end_col: u32,
    /// Start index into the file's significant token sequence.
    pub token_start: u32,
    /// Number of significant tokens covered.
    pub token_count: u32,
}

impl HashLocation {
    /// Whether two locations in the same file cover overlapping lines.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.file_id != other.file_id {
            return false;
        }
        !(self.end_line < other.start_line || self.start_line > other.end_line)
    }
}

/// Two locations identified as clones of each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClonePair {
    pub location_a: HashLocation,
    pub location_b: HashLocation,
    pub clone_type: CloneType,
    /// Alignment similarity in [0, 1]; 1.0 for exact-hash seeds.
    pub similarity: f32,
    /// The window hash that produced the seed (kept for debugging).
    pub shared_hash: u64,
}

impl ClonePair {
    /// Token size of the clone, the smaller of the two sides.
    #[must_use]
    pub fn token_count(&self) -> u32 {
        self.location_a.token_count.min(self.location_b.token_count)
    }

    /// Line size of the clone, the smaller of the two sides.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        let a = self.location_a.end_line - self.location_a.start_line + 1;
        let b = self.location_b.end_line - self.location_b.start_line + 1;
        a.min(b)
    }
}

/// Aggregate statistics over the index contents.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_hashes: usize,
    pub total_locations: usize,
    /// Hashes appearing at more than one location.
    pub duplicate_hashes: usize,
    pub max_locations_per_hash: usize,
}

// =============================================================================
// HASH INDEX
// =============================================================================

/// Inverted map from window hash to source locations, plus the file table.
///
/// File ids are dense and stable: the id assigned to a path at registration
/// never changes for the life of the index.
#[derive(Debug, Default)]
pub struct HashIndex {
    index: FxHashMap<u64, Vec<HashLocation>>,
    file_paths: Vec<PathBuf>,
    path_to_id: FxHashMap<PathBuf, u32>,
}

impl HashIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all contents.
    pub fn clear(&mut self) {
        self.index.clear();
        self.file_paths.clear();
        self.path_to_id.clear();
    }

    /// Register a file, returning its id. Registering the same path twice
    /// returns the same id.
    pub fn register_file(&mut self, path: &Path) -> u32 {
        if let Some(&id) = self.path_to_id.get(path) {
            return id;
        }
        let id = self.file_paths.len() as u32;
        self.file_paths.push(path.to_path_buf());
        self.path_to_id.insert(path.to_path_buf(), id);
        id
    }

    /// Path registered under `file_id`, if any.
    #[must_use]
    pub fn file_path(&self, file_id: u32) -> Option<&Path> {
        self.file_paths.get(file_id as usize).map(PathBuf::as_path)
    }

    /// All registered paths in id order.
    #[must_use]
    pub fn file_paths(&self) -> &[PathBuf] {
        &self.file_paths
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.file_paths.len()
    }

    /// Record that `hash` occurred at `location`.
    pub fn add_hash(&mut self, hash: u64, location: HashLocation) {
        self.index.entry(hash).or_default().push(location);
    }

    /// All locations recorded for a hash.
    #[must_use]
    pub fn locations(&self, hash: u64) -> Option<&[HashLocation]> {
        self.index.get(&hash).map(Vec::as_slice)
    }

    /// Number of distinct hashes.
    #[must_use]
    pub fn hash_count(&self) -> usize {
        self.index.len()
    }

    /// Total number of stored locations.
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            total_files: self.file_paths.len(),
            total_hashes: self.index.len(),
            ..Default::default()
        };
        for locations in self.index.values() {
            stats.total_locations += locations.len();
            if locations.len() > 1 {
                stats.duplicate_hashes += 1;
            }
            stats.max_locations_per_hash = stats.max_locations_per_hash.max(locations.len());
        }
        stats
    }

    /// Enumerate every clone pair in the index.
    ///
    /// For each hash with at least two locations, emits every unordered
    /// location pair, except same-file pairs whose line ranges overlap.
    /// Pairs start as Type-1 with similarity 1.0; later stages reclassify.
    #[must_use]
    pub fn find_clone_pairs(&self) -> Vec<ClonePair> {
        let mut results = Vec::new();
        for (&hash, locations) in &self.index {
            if locations.len() < 2 {
                continue;
            }
            emit_pairs(hash, locations, &mut results);
        }
        results
    }

    /// Parallel pair enumeration.
    ///
    /// Partitions duplicate hashes across rayon workers, each filling a
    /// local bucket; buckets are concatenated at the barrier. The result is
    /// multiset-equal to [`Self::find_clone_pairs`]; ordering is
    /// unspecified. Small workloads fall back to the sequential path.
    #[must_use]
    pub fn find_clone_pairs_parallel(&self) -> Vec<ClonePair> {
        let work_items: Vec<(u64, &Vec<HashLocation>)> = self
            .index
            .iter()
            .filter(|(_, locations)| locations.len() >= 2)
            .map(|(&hash, locations)| (hash, locations))
            .collect();

        if work_items.len() < MIN_HASHES_FOR_PARALLEL || rayon::current_num_threads() <= 1 {
            return self.find_clone_pairs();
        }

        debug!(
            duplicate_hashes = work_items.len(),
            "parallel pair enumeration"
        );

        work_items
            .par_iter()
            .fold(Vec::new, |mut bucket, (hash, locations)| {
                emit_pairs(*hash, locations, &mut bucket);
                bucket
            })
            .reduce(Vec::new, |mut acc, mut bucket| {
                acc.append(&mut bucket);
                acc
            })
    }

    /// Merge adjacent clone pairs into larger regions.
    ///
    /// Pairs are sorted by their canonical (smaller, larger) file-id tuple
    /// and then swept: a pair extends the current region when both of its
    /// sides start within `max_gap` tokens past the region's ends. A nested
    /// pair (entirely inside the region) merges the same way, leaving the
    /// outer range. Output order matches the sort order, and merging
    /// already-merged output is a fixed point.
    #[must_use]
    pub fn merge_adjacent_clones(mut pairs: Vec<ClonePair>, max_gap: usize) -> Vec<ClonePair> {
        if pairs.is_empty() {
            return pairs;
        }
        let max_gap = max_gap as u32;

        pairs.sort_by(|a, b| {
            let a_key = (
                a.location_a.file_id.min(a.location_b.file_id),
                a.location_a.file_id.max(a.location_b.file_id),
                a.location_a.token_start,
            );
            let b_key = (
                b.location_a.file_id.min(b.location_b.file_id),
                b.location_a.file_id.max(b.location_b.file_id),
                b.location_a.token_start,
            );
            a_key.cmp(&b_key)
        });

        let mut merged = Vec::new();
        let mut current = pairs[0];

        for &next in &pairs[1..] {
            let same_files = (current.location_a.file_id == next.location_a.file_id
                && current.location_b.file_id == next.location_b.file_id)
                || (current.location_a.file_id == next.location_b.file_id
                    && current.location_b.file_id == next.location_a.file_id);

            if !same_files {
                merged.push(current);
                current = next;
                continue;
            }

            // Orient `next` the same way as `current`.
            let curr_a = current.location_a;
            let curr_b = current.location_b;
            let (next_a, next_b) = if current.location_a.file_id != next.location_a.file_id {
                (next.location_b, next.location_a)
            } else {
                (next.location_a, next.location_b)
            };

            let curr_end_a = curr_a.token_start + curr_a.token_count;
            let curr_end_b = curr_b.token_start + curr_b.token_count;

            let adjacent_a = next_a.token_start <= curr_end_a + max_gap
                && next_a.token_start >= curr_a.token_start;
            let adjacent_b = next_b.token_start <= curr_end_b + max_gap
                && next_b.token_start >= curr_b.token_start;

            if adjacent_a && adjacent_b {
                let new_end_a = curr_end_a.max(next_a.token_start + next_a.token_count);
                let new_end_b = curr_end_b.max(next_b.token_start + next_b.token_count);
                current.location_a.token_count = new_end_a - current.location_a.token_start;
                current.location_b.token_count = new_end_b - current.location_b.token_start;
                current.location_a.end_line = curr_a.end_line.max(next_a.end_line);
                current.location_b.end_line = curr_b.end_line.max(next_b.end_line);
                current.location_a.end_col = curr_a.end_col.max(next_a.end_col);
                current.location_b.end_col = curr_b.end_col.max(next_b.end_col);
            } else {
                merged.push(current);
                current = next;
            }
        }

        merged.push(current);
        merged
    }

    /// Drop pairs whose smaller side is below `min_tokens`.
    #[must_use]
    pub fn filter_by_size(pairs: Vec<ClonePair>, min_tokens: usize) -> Vec<ClonePair> {
        pairs
            .into_iter()
            .filter(|p| p.token_count() as usize >= min_tokens)
            .collect()
    }
}

/// Emit all non-overlapping unordered pairs for one hash bucket.
fn emit_pairs(hash: u64, locations: &[HashLocation], out: &mut Vec<ClonePair>) {
    for i in 0..locations.len() {
        for j in i + 1..locations.len() {
            let loc_a = locations[i];
            let loc_b = locations[j];

            // Self-overlap: the same region matching itself is noise.
            if loc_a.file_id == loc_b.file_id && loc_a.overlaps(&loc_b) {
                continue;
            }

            out.push(ClonePair {
                location_a: loc_a,
                location_b: loc_b,
                clone_type: CloneType::Type1,
                similarity: 1.0,
                shared_hash: hash,
            });
        }
    }
}

// =============================================================================
// INDEX BUILDER
// =============================================================================

/// Populates a [`HashIndex`] from tokenized files.
pub struct HashIndexBuilder {
    window_size: usize,
    index: HashIndex,
}

impl HashIndexBuilder {
    /// Create a builder over a fresh index.
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        Self::with_index(HashIndex::new(), window_size)
    }

    /// Create a builder over an existing index, preserving the file ids
    /// registered so far.
    #[must_use]
    pub fn with_index(index: HashIndex, window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            index,
        }
    }

    /// Insert every k-window of a file's significant token sequence.
    ///
    /// With `use_normalized`, windows hash the normalized per-token hashes
    /// (Type-2 capable); otherwise the original hashes (Type-1 only).
    /// Files with fewer significant tokens than the window size contribute
    /// nothing.
    pub fn add_file(&mut self, file: &TokenizedFile, use_normalized: bool) {
        if file.tokens.is_empty() {
            return;
        }

        let file_id = self.index.register_file(&file.path);
        let significant = file.significant();
        if significant.len() < self.window_size {
            return;
        }

        let token_hashes: Vec<u64> = significant
            .iter()
            .map(|t| {
                if use_normalized {
                    u64::from(t.normalized_hash)
                } else {
                    u64::from(t.original_hash)
                }
            })
            .collect();

        for (pos, hash) in rolling::compute_all(&token_hashes, self.window_size) {
            let first = significant[pos];
            let last = significant[pos + self.window_size - 1];

            self.index.add_hash(
                hash,
                HashLocation {
                    file_id,
                    start_line: first.line,
                    end_line: last.line,
                    start_col: first.column,
                    end_col: last.column + last.length,
                    token_start: pos as u32,
                    token_count: self.window_size as u32,
                },
            );
        }
    }

    #[must_use]
    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    /// Consume the builder, returning the populated index.
    #[must_use]
    pub fn finish(self) -> HashIndex {
        self.index
    }
}

// =============================================================================
// TESTS
// =============================================================================
