//! Seed-and-extend engine for Type-3 clone detection.
//!
//! Exact-hash seeds only ever cover identical windows. To find near-miss
//! clones the extender grows each seed forward and backward while the two
//! token streams keep matching, tolerating bounded gaps (insertions or
//! deletions) on either side. The grown region is then re-scored with an
//! alignment similarity; extensions that fall below the configured
//! threshold are discarded in favour of the original seed.
//!
//! Each seed passes through a fixed sequence of states - extending forward,
//! extending backward, re-scoring, then accepted or rejected - and never
//! revisits one.
//!
//! All indices here refer to the significant token sequence of a file (the
//! same coordinates the index builder emits); every access is clamped, so
//! extension is total even on inconsistent input.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::index::{ClonePair, CloneType};
use crate::token::NormalizedToken;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tuning knobs for clone extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtendConfig {
    /// Maximum tokens skipped on either side when resyncing over a gap.
    pub max_gap: usize,
    /// Search radius when looking for a resync point.
    pub lookahead: usize,
    /// Minimum alignment similarity for an extension to be kept.
    pub min_similarity: f32,
    /// Minimum token count after extension.
    pub min_tokens: usize,
}

impl Default for ExtendConfig {
    fn default() -> Self {
        Self {
            max_gap: 5,
            lookahead: 10,
            min_similarity: 0.7,
            min_tokens: 30,
        }
    }
}

// =============================================================================
// EXTENDER
// =============================================================================

/// Extends seed clone pairs into maximal approximate regions.
pub struct CloneExtender {
    config: ExtendConfig,
}

/// Phases of the per-seed extension machine.
enum Phase {
    Forward,
    Backward,
    Rescore,
}

impl CloneExtender {
    #[must_use]
    pub fn new(config: ExtendConfig) -> Self {
        Self { config }
    }

    /// Extend every pair, keyed by the significant token sequences of the
    /// involved files.
    ///
    /// A pair whose file is missing from `files` passes through unchanged.
    /// The `min_tokens` filter applies after extension.
    #[must_use]
    pub fn extend_all(
        &self,
        pairs: &[ClonePair],
        files: &FxHashMap<u32, Vec<NormalizedToken>>,
    ) -> Vec<ClonePair> {
        let mut extended_pairs = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let (Some(tokens_a), Some(tokens_b)) = (
                files.get(&pair.location_a.file_id),
                files.get(&pair.location_b.file_id),
            ) else {
                extended_pairs.push(*pair);
                continue;
            };

            let extended = self.extend(pair, tokens_a, tokens_b);
            if extended.token_count() as usize >= self.config.min_tokens {
                extended_pairs.push(extended);
            }
        }

        extended_pairs
    }

    /// Extend a single seed pair.
    ///
    /// Returns the extended pair if its re-scored similarity clears the
    /// threshold, otherwise the original seed.
    #[must_use]
    pub fn extend(
        &self,
        pair: &ClonePair,
        tokens_a: &[NormalizedToken],
        tokens_b: &[NormalizedToken],
    ) -> ClonePair {
        let mut start_a = (pair.location_a.token_start as usize).min(tokens_a.len());
        let mut start_b = (pair.location_b.token_start as usize).min(tokens_b.len());
        let mut end_a = (start_a + pair.location_a.token_count as usize).min(tokens_a.len());
        let mut end_b = (start_b + pair.location_b.token_count as usize).min(tokens_b.len());

        let mut phase = Phase::Forward;
        loop {
            phase = match phase {
                Phase::Forward => {
                    (end_a, end_b) = self.extend_forward(tokens_a, end_a, tokens_b, end_b);
                    Phase::Backward
                }
                Phase::Backward => {
                    (start_a, start_b) = self.extend_backward(tokens_a, start_a, tokens_b, start_b);
                    Phase::Rescore
                }
                Phase::Rescore => {
                    let sim = alignment_similarity(
                        &tokens_a[start_a..end_a],
                        &tokens_b[start_b..end_b],
                        self.config.max_gap,
                    );
                    if sim < self.config.min_similarity {
                        return *pair;
                    }
                    return self.rebuild_pair(
                        pair, sim, tokens_a, start_a, end_a, tokens_b, start_b, end_b,
                    );
                }
            };
        }
    }

    /// Walk forward from the seed's ends while normalized hashes match,
    /// resyncing over bounded gaps. Returns the new (exclusive) ends.
    fn extend_forward(
        &self,
        tokens_a: &[NormalizedToken],
        mut pos_a: usize,
        tokens_b: &[NormalizedToken],
        mut pos_b: usize,
    ) -> (usize, usize) {
        while pos_a < tokens_a.len() && pos_b < tokens_b.len() {
            if tokens_a[pos_a].normalized_hash == tokens_b[pos_b].normalized_hash {
                pos_a += 1;
                pos_b += 1;
                continue;
            }

            // Scan the lookahead rectangle, nearest offsets first, for a
            // point where the streams match again.
            let mut resynced = false;
            'search: for la in 0..=self.config.lookahead {
                if pos_a + la >= tokens_a.len() {
                    break;
                }
                for lb in 0..=self.config.lookahead {
                    if pos_b + lb >= tokens_b.len() {
                        break;
                    }
                    if la == 0 && lb == 0 {
                        continue;
                    }
                    if tokens_a[pos_a + la].normalized_hash
                        == tokens_b[pos_b + lb].normalized_hash
                        && la <= self.config.max_gap
                        && lb <= self.config.max_gap
                    {
                        pos_a += la;
                        pos_b += lb;
                        resynced = true;
                        break 'search;
                    }
                }
            }

            if !resynced {
                break;
            }
        }

        (pos_a, pos_b)
    }

    /// Mirror image of [`Self::extend_forward`], stepping backward from the
    /// seed's starts. Returns the new (inclusive) starts.
    fn extend_backward(
        &self,
        tokens_a: &[NormalizedToken],
        mut pos_a: usize,
        tokens_b: &[NormalizedToken],
        mut pos_b: usize,
    ) -> (usize, usize) {
        while pos_a > 0 && pos_b > 0 {
            let check_a = pos_a - 1;
            let check_b = pos_b - 1;

            if tokens_a[check_a].normalized_hash == tokens_b[check_b].normalized_hash {
                pos_a -= 1;
                pos_b -= 1;
                continue;
            }

            let mut resynced = false;
            'search: for la in 0..=self.config.lookahead {
                if la > check_a {
                    break;
                }
                for lb in 0..=self.config.lookahead {
                    if lb > check_b {
                        break;
                    }
                    if la == 0 && lb == 0 {
                        continue;
                    }
                    if tokens_a[check_a - la].normalized_hash
                        == tokens_b[check_b - lb].normalized_hash
                        && la <= self.config.max_gap
                        && lb <= self.config.max_gap
                    {
                        pos_a = check_a - la;
                        pos_b = check_b - lb;
                        resynced = true;
                        break 'search;
                    }
                }
            }

            if !resynced {
                break;
            }
        }

        (pos_a, pos_b)
    }

    /// Assemble the accepted extension: updated spans, line ranges,
    /// similarity, and final classification.
    #[allow(clippy::too_many_arguments)]
    fn rebuild_pair(
        &self,
        pair: &ClonePair,
        sim: f32,
        tokens_a: &[NormalizedToken],
        start_a: usize,
        end_a: usize,
        tokens_b: &[NormalizedToken],
        start_b: usize,
        end_b: usize,
    ) -> ClonePair {
        let mut extended = *pair;
        extended.location_a.token_start = start_a as u32;
        extended.location_a.token_count = (end_a - start_a) as u32;
        extended.location_b.token_start = start_b as u32;
        extended.location_b.token_count = (end_b - start_b) as u32;
        extended.similarity = sim;

        if let Some(first) = tokens_a.get(start_a) {
            extended.location_a.start_line = first.line;
        }
        if end_a > 0 {
            if let Some(last) = tokens_a.get(end_a - 1) {
                extended.location_a.end_line = last.line;
            }
        }
        if let Some(first) = tokens_b.get(start_b) {
            extended.location_b.start_line = first.line;
        }
        if end_b > 0 {
            if let Some(last) = tokens_b.get(end_b - 1) {
                extended.location_b.end_line = last.line;
            }
        }

        extended.clone_type = if sim >= 1.0 {
            // A perfect alignment is still Type-1 or Type-2; the original
            // hashes decide which.
            let count = (end_a - start_a).min(end_b - start_b);
            let all_match = (0..count).all(|i| {
                tokens_a[start_a + i].original_hash == tokens_b[start_b + i].original_hash
            });
            if all_match {
                CloneType::Type1
            } else {
                CloneType::Type2
            }
        } else {
            CloneType::Type3
        };

        extended
    }
}

// =============================================================================
// SIMILARITY MEASURES
// =============================================================================

/// Alignment similarity of two token ranges with bounded-gap resync.
///
/// Two pointers walk the ranges; on a mismatch, up to `max_gap` positions
/// ahead in B and then in A are probed for a resync, otherwise both advance.
/// The score is `matches / max(len_a, len_b)`, in [0, 1].
#[must_use]
pub fn alignment_similarity(
    tokens_a: &[NormalizedToken],
    tokens_b: &[NormalizedToken],
    max_gap: usize,
) -> f32 {
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let mut matches = 0usize;
    let mut pos_a = 0usize;
    let mut pos_b = 0usize;

    while pos_a < tokens_a.len() && pos_b < tokens_b.len() {
        if tokens_a[pos_a].normalized_hash == tokens_b[pos_b].normalized_hash {
            matches += 1;
            pos_a += 1;
            pos_b += 1;
            continue;
        }

        let mut found = false;

        for g in 1..=max_gap {
            if pos_b + g >= tokens_b.len() {
                break;
            }
            if tokens_a[pos_a].normalized_hash == tokens_b[pos_b + g].normalized_hash {
                pos_b += g;
                found = true;
                break;
            }
        }

        if !found {
            for g in 1..=max_gap {
                if pos_a + g >= tokens_a.len() {
                    break;
                }
                if tokens_a[pos_a + g].normalized_hash == tokens_b[pos_b].normalized_hash {
                    pos_a += g;
                    found = true;
                    break;
                }
            }
        }

        if !found {
            pos_a += 1;
            pos_b += 1;
        }
    }

    matches as f32 / tokens_a.len().max(tokens_b.len()) as f32
}

/// Jaccard similarity over the multisets of normalized hashes.
///
/// Order-insensitive; used as a cheap screen and in tests, not on the
/// extension hot path.
#[must_use]
pub fn jaccard_similarity(tokens_a: &[NormalizedToken], tokens_b: &[NormalizedToken]) -> f32 {
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let mut counts_a: FxHashMap<u32, usize> = FxHashMap::default();
    let mut counts_b: FxHashMap<u32, usize> = FxHashMap::default();
    for t in tokens_a {
        *counts_a.entry(t.normalized_hash).or_default() += 1;
    }
    for t in tokens_b {
        *counts_b.entry(t.normalized_hash).or_default() += 1;
    }

    let intersection: usize = counts_a
        .iter()
        .map(|(hash, &count)| count.min(counts_b.get(hash).copied().unwrap_or(0)))
        .sum();
    let union = tokens_a.len() + tokens_b.len() - intersection;

    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

// =============================================================================
// TESTS
// =============================================================================
