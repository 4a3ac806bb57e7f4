//! The clone detection pipeline driver.
//!
//! [`SimilarityDetector::analyze`] runs four phases over a set of source
//! files:
//!
//! 1. **Tokenize** - each file is lexed into normalized tokens (parallel
//!    across files; file ids are assigned serially afterwards so they are
//!    deterministic for a fixed input order).
//! 2. **Index** - every k-window of every file goes into the inverted hash
//!    index (single-threaded; the index is read-only afterwards).
//! 3. **Match** - pair enumeration, adjacency merging, size filtering,
//!    Type-1/Type-2 classification, and optional Type-3 extension.
//! 4. **Report** - clone entries, hotspots, per-language metrics, timing.
//!
//! Per-file problems never fail an analysis: files with no tokenizer or
//! unreadable contents are skipped and simply absent from the report. An
//! empty input produces a fully-formed empty report.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use fxhash::FxHashMap;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::cache::{CacheStats, TokenCache};
use crate::config::DetectorConfig;
use crate::error::Result;
use crate::extend::{CloneExtender, ExtendConfig};
use crate::index::{ClonePair, CloneType, HashIndex, HashIndexBuilder};
use crate::lang::Language;
use crate::report::SimilarityReport;
use crate::scan;
use crate::token::{NormalizedToken, TokenizedFile};

/// Minimum files before tokenization goes parallel.
const MIN_FILES_FOR_PARALLEL: usize = 4;

/// Gap tolerance (tokens) when coalescing adjacent window pairs. Windows
/// from the same clone overlap or nearly touch, so a small constant
/// suffices; the configurable gap budget applies to Type-3 extension.
const MERGE_MAX_GAP: usize = 5;

/// Resync search radius during Type-3 extension.
const EXTEND_LOOKAHEAD: usize = 10;

// =============================================================================
// ANALYSIS STATE
// =============================================================================

/// Everything accumulated over one `analyze` call. Nothing survives the
/// call; repeated analyses are independent.
#[derive(Default)]
struct AnalysisState {
    index: HashIndex,
    tokenized_files: Vec<TokenizedFile>,
    /// Significant (structural-stripped) token sequences by file id; the
    /// coordinate space shared by the index, classifier and extender.
    significant: FxHashMap<u32, Vec<NormalizedToken>>,
    /// Raw sources by file id, for snippet extraction.
    sources: FxHashMap<u32, String>,
    /// Total line counts by file id, for hotspot scoring.
    line_counts: FxHashMap<u32, u32>,
    total_tokens: usize,
    parallel_enabled: bool,
    thread_count: usize,
    tokenize_ms: u64,
    hash_ms: u64,
    match_ms: u64,
}

// =============================================================================
// DETECTOR
// =============================================================================

/// Token-based clone detector over a set of source files.
pub struct SimilarityDetector {
    config: DetectorConfig,
    pool: OnceCell<rayon::ThreadPool>,
    cache: TokenCache,
}

impl SimilarityDetector {
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
            cache: TokenCache::new(),
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DetectorConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Drop all cached tokenized files.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Analyze every matching file under a directory root.
    pub fn analyze(&self, root: &Path) -> Result<SimilarityReport> {
        let start = Instant::now();
        let files = scan::find_files(
            root,
            &self.config.extensions,
            &self.config.exclude_patterns,
        )?;
        Ok(self.run(&files, start))
    }

    /// Analyze an explicit list of files. Missing paths are skipped.
    #[must_use]
    pub fn analyze_files(&self, paths: &[PathBuf]) -> SimilarityReport {
        let start = Instant::now();
        let files: Vec<PathBuf> = paths.iter().filter(|p| p.exists()).cloned().collect();
        self.run(&files, start)
    }

    /// Convenience wrapper comparing exactly two files.
    #[must_use]
    pub fn compare(&self, file_a: &Path, file_b: &Path) -> SimilarityReport {
        self.analyze_files(&[file_a.to_path_buf(), file_b.to_path_buf()])
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    fn run(&self, files: &[PathBuf], start: Instant) -> SimilarityReport {
        if files.is_empty() {
            let mut report = SimilarityReport::default();
            report.finalize(0, 0, start.elapsed().as_millis() as u64);
            return report;
        }

        debug!(files = files.len(), "starting clone analysis");

        let mut state = AnalysisState::default();
        self.tokenize_files(files, &mut state);
        self.build_index(&mut state);
        let clones = self.find_clones(&mut state);

        self.generate_report(&clones, &state, start.elapsed().as_millis() as u64)
    }

    fn tokenize_files(&self, files: &[PathBuf], state: &mut AnalysisState) {
        let phase_start = Instant::now();

        let use_parallel = files.len() >= MIN_FILES_FOR_PARALLEL
            && self.thread_count() > 1
            && self.pool().is_some();
        state.parallel_enabled = use_parallel;
        state.thread_count = if use_parallel { self.thread_count() } else { 1 };

        // Rayon's indexed collect preserves input order, so the serial
        // registration below assigns the same file ids as a sequential run.
        let results: Vec<(TokenizedFile, String)> = if use_parallel {
            self.pool()
                .expect("pool checked above")
                .install(|| {
                    files
                        .par_iter()
                        .filter_map(|path| self.tokenize_single_file(path))
                        .collect()
                })
        } else {
            files
                .iter()
                .filter_map(|path| self.tokenize_single_file(path))
                .collect()
        };

        for (tokenized, source) in results {
            let file_id = state.index.register_file(&tokenized.path);
            state.sources.insert(file_id, source);
            state.line_counts.insert(file_id, tokenized.total_lines);
            state.significant.insert(file_id, tokenized.significant());
            state.total_tokens += tokenized.tokens.len();
            state.tokenized_files.push(tokenized);
        }

        state.tokenize_ms = phase_start.elapsed().as_millis() as u64;
        debug!(
            files = state.tokenized_files.len(),
            tokens = state.total_tokens,
            parallel = state.parallel_enabled,
            "tokenization complete"
        );
    }

    /// Tokenize one file, consulting the cache. Returns `None` for files
    /// with no tokenizer or unreadable contents; both are skip conditions,
    /// not errors.
    fn tokenize_single_file(&self, path: &Path) -> Option<(TokenizedFile, String)> {
        let Some(lang) = Language::detect(path) else {
            trace!(path = %path.display(), "no tokenizer for extension, skipping");
            return None;
        };

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "read failed, skipping");
                return None;
            }
        };

        if let Some(cached) = self.cache.get(path) {
            return Some((cached, source));
        }

        let mut tokenized = lang.tokenize(&source);
        tokenized.path = path.to_path_buf();
        self.cache.put(path.to_path_buf(), tokenized.clone());
        Some((tokenized, source))
    }

    fn build_index(&self, state: &mut AnalysisState) {
        let phase_start = Instant::now();

        // Reuse the state's index so file ids assigned during tokenization
        // stay valid.
        let mut builder = HashIndexBuilder::with_index(
            std::mem::take(&mut state.index),
            self.config.window_size,
        );
        for file in &state.tokenized_files {
            builder.add_file(file, self.config.detect_type2);
        }
        state.index = builder.finish();

        state.hash_ms = phase_start.elapsed().as_millis() as u64;
        debug!(
            hashes = state.index.hash_count(),
            locations = state.index.location_count(),
            "index build complete"
        );
    }

    fn find_clones(&self, state: &mut AnalysisState) -> Vec<ClonePair> {
        let phase_start = Instant::now();

        let mut pairs = if state.parallel_enabled {
            match self.pool() {
                Some(pool) => pool.install(|| state.index.find_clone_pairs_parallel()),
                None => state.index.find_clone_pairs(),
            }
        } else {
            state.index.find_clone_pairs()
        };

        pairs = HashIndex::merge_adjacent_clones(pairs, MERGE_MAX_GAP);
        pairs = HashIndex::filter_by_size(pairs, self.config.min_clone_tokens);

        for pair in &mut pairs {
            pair.clone_type = self.classify_clone(pair, state);
        }

        if self.config.detect_type3 {
            let extender = CloneExtender::new(ExtendConfig {
                max_gap: self.config.max_gap_tokens,
                lookahead: EXTEND_LOOKAHEAD,
                min_similarity: self.config.similarity_threshold,
                min_tokens: self.config.min_clone_tokens,
            });
            pairs = extender.extend_all(&pairs, &state.significant);
        }

        // Largest clones first.
        pairs.sort_by(|a, b| b.token_count().cmp(&a.token_count()));

        state.match_ms = phase_start.elapsed().as_millis() as u64;
        debug!(clones = pairs.len(), "matching complete");
        pairs
    }

    /// Distinguish Type-1 from Type-2.
    ///
    /// The pair exists because normalized hashes matched; if any original
    /// hash differs across the two ranges, something was renamed (Type-2),
    /// otherwise the regions are byte-equal modulo layout (Type-1).
    fn classify_clone(&self, pair: &ClonePair, state: &AnalysisState) -> CloneType {
        if !self.config.detect_type2 {
            return CloneType::Type1;
        }

        let (Some(tokens_a), Some(tokens_b)) = (
            state.significant.get(&pair.location_a.file_id),
            state.significant.get(&pair.location_b.file_id),
        ) else {
            return CloneType::Type1;
        };

        let start_a = pair.location_a.token_start as usize;
        let count_a = pair.location_a.token_count as usize;
        let start_b = pair.location_b.token_start as usize;
        let count_b = pair.location_b.token_count as usize;

        if start_a + count_a > tokens_a.len() || start_b + count_b > tokens_b.len() {
            return CloneType::Type1;
        }
        if count_a != count_b {
            return CloneType::Type2;
        }

        let all_original_match = (0..count_a)
            .all(|i| tokens_a[start_a + i].original_hash == tokens_b[start_b + i].original_hash);
        if all_original_match {
            CloneType::Type1
        } else {
            CloneType::Type2
        }
    }

    fn generate_report(
        &self,
        clones: &[ClonePair],
        state: &AnalysisState,
        total_ms: u64,
    ) -> SimilarityReport {
        let mut report = SimilarityReport::default();

        let file_paths: Vec<String> = state
            .index
            .file_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect();

        for pair in clones {
            report.add_clone(pair, &file_paths, &state.sources);
        }

        // Per-language counts over files involved in clones.
        for file in &state.tokenized_files {
            let Some(lang) = Language::detect(&file.path) else {
                continue;
            };
            let path_str = file.path.display().to_string();
            let involved = clones
                .iter()
                .filter(|c| {
                    file_paths.get(c.location_a.file_id as usize) == Some(&path_str)
                        || file_paths.get(c.location_b.file_id as usize) == Some(&path_str)
                })
                .count();
            if involved > 0 {
                *report
                    .metrics
                    .by_language
                    .entry(lang.name().to_string())
                    .or_default() += involved;
            }
        }

        report.calculate_hotspots(&file_paths, &state.line_counts);

        let total_lines: usize = state
            .tokenized_files
            .iter()
            .map(|f| f.total_lines as usize)
            .sum();

        report.timing.tokenize_ms = state.tokenize_ms;
        report.timing.hash_ms = state.hash_ms;
        report.timing.match_ms = state.match_ms;

        report.finalize_with_perf(
            state.tokenized_files.len(),
            total_lines,
            total_ms,
            state.total_tokens,
            state.thread_count,
            state.parallel_enabled,
        );

        report
    }

    // -------------------------------------------------------------------------
    // Worker pool
    // -------------------------------------------------------------------------

    fn thread_count(&self) -> usize {
        if self.config.num_threads > 0 {
            self.config.num_threads
        } else {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4)
        }
    }

    /// The detector's worker pool, built on first use. `None` if the pool
    /// could not be created; callers fall back to sequential execution.
    fn pool(&self) -> Option<&rayon::ThreadPool> {
        self.pool
            .get_or_try_init(|| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.thread_count())
                    .build()
            })
            .ok()
    }
}

impl Default for SimilarityDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// A Python function long enough to clear the default size filter.
    fn long_function(name: &str, var: &str) -> String {
        format!(
            "def {name}(data):\n\
             \x20   {var} = []\n\
             \x20   for item in data:\n\
             \x20       if item > 0:\n\
             \x20           {var}.append(item * 2)\n\
             \x20       else:\n\
             \x20           {var}.append(item - 1)\n\
             \x20   total = sum({var})\n\
             \x20   count = len({var})\n\
             \x20   return total / count\n"
        )
    }

    #[test]
    fn test_empty_input_gives_empty_report() {
        let detector = SimilarityDetector::with_defaults();
        let report = detector.analyze_files(&[]);
        assert_eq!(report.summary.files_analyzed, 0);
        assert_eq!(report.summary.clone_pairs_found, 0);
        assert_eq!(report.summary.estimated_duplication, "0.0%");
    }

    #[test]
    fn test_missing_files_skipped() {
        let detector = SimilarityDetector::with_defaults();
        let report = detector.analyze_files(&[PathBuf::from("/nonexistent/x.py")]);
        assert_eq!(report.summary.files_analyzed, 0);
    }

    #[test]
    fn test_unsupported_language_skipped() {
        let dir = TempDir::new().unwrap();
        let txt = write(&dir, "notes.txt", "some text\n");
        let detector = SimilarityDetector::with_defaults();
        let report = detector.analyze_files(&[txt]);
        assert_eq!(report.summary.files_analyzed, 0);
    }

    #[test]
    fn test_exact_duplicate_is_type1() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", &long_function("process", "values"));
        let b = write(&dir, "b.py", &long_function("process", "values"));

        let detector = SimilarityDetector::with_defaults();
        let report = detector.compare(&a, &b);

        assert!(report.summary.clone_pairs_found >= 1);
        assert!(report.clones.iter().all(|c| c.clone_type == "Type-1"));
        assert!(report.clones.iter().all(|c| (c.similarity - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_renamed_variables_are_type2() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", &long_function("process", "values"));
        let b = write(&dir, "b.py", &long_function("handle", "results"));

        let detector = SimilarityDetector::with_defaults();
        let report = detector.compare(&a, &b);

        assert!(report.summary.clone_pairs_found >= 1);
        assert!(report.clones.iter().any(|c| c.clone_type == "Type-2"));
    }

    #[test]
    fn test_type2_detection_disabled() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", &long_function("process", "values"));
        let b = write(&dir, "b.py", &long_function("handle", "results"));

        let config = DetectorConfig::default().with_type2(false);
        let detector = SimilarityDetector::new(config);
        let report = detector.compare(&a, &b);

        // Original hashes differ, so without normalized indexing the
        // renamed copy is invisible.
        assert_eq!(report.summary.clone_pairs_found, 0);
    }

    #[test]
    fn test_different_code_no_clones() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", &long_function("process", "values"));
        let b = write(
            &dir,
            "b.py",
            "class Config:\n    def __init__(self):\n        self.debug = False\n",
        );

        let detector = SimilarityDetector::with_defaults();
        let report = detector.compare(&a, &b);
        assert_eq!(report.summary.clone_pairs_found, 0);
    }

    #[test]
    fn test_report_locations_and_hotspots() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", &long_function("process", "values"));
        let b = write(&dir, "b.py", &long_function("process", "values"));

        let detector = SimilarityDetector::with_defaults();
        let report = detector.compare(&a, &b);

        let clone = &report.clones[0];
        assert_eq!(clone.locations.len(), 2);
        assert!(clone.locations[0].end_line >= clone.locations[0].start_line);
        assert!(!clone.locations[0].snippet_preview.is_empty());

        assert_eq!(report.hotspots.len(), 2);
        for hotspot in &report.hotspots {
            assert!(hotspot.duplication_score > 0.0);
            assert!(hotspot.duplication_score <= 1.0);
        }

        assert_eq!(report.summary.files_analyzed, 2);
        assert!(report.summary.total_lines > 0);
        assert_eq!(report.metrics.by_language.get("Python"), Some(&2));
    }

    #[test]
    fn test_pipeline_deterministic() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", &long_function("process", "values"));
        let b = write(&dir, "b.py", &long_function("handle", "results"));
        let paths = [a, b];

        let detector = SimilarityDetector::with_defaults();
        let first = detector.analyze_files(&paths);
        let second = detector.analyze_files(&paths);

        assert_eq!(first.summary.clone_pairs_found, second.summary.clone_pairs_found);
        for (x, y) in first.clones.iter().zip(&second.clones) {
            assert_eq!(x.clone_type, y.clone_type);
            assert_eq!(x.locations[0].start_line, y.locations[0].start_line);
            assert_eq!(x.locations[1].start_line, y.locations[1].start_line);
        }
    }

    #[test]
    fn test_cache_reused_across_analyses() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", &long_function("process", "values"));
        let b = write(&dir, "b.py", &long_function("process", "values"));
        let paths = [a, b];

        let detector = SimilarityDetector::with_defaults();
        let _ = detector.analyze_files(&paths);
        assert_eq!(detector.cache_stats().misses, 2);

        let _ = detector.analyze_files(&paths);
        assert_eq!(detector.cache_stats().hits, 2);

        detector.clear_cache();
        assert_eq!(detector.cache_stats().len, 0);
    }

    #[test]
    fn test_analyze_directory() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", &long_function("process", "values"));
        write(&dir, "b.py", &long_function("process", "values"));
        write(&dir, "ignored.txt", "not code\n");

        let detector = SimilarityDetector::with_defaults();
        let report = detector.analyze(dir.path()).unwrap();
        assert_eq!(report.summary.files_analyzed, 2);
        assert!(report.summary.clone_pairs_found >= 1);
    }

    #[test]
    fn test_explicit_thread_count() {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..6 {
            paths.push(write(
                &dir,
                &format!("f{i}.py"),
                &long_function("process", "values"),
            ));
        }

        let config = DetectorConfig::default().with_threads(2);
        let detector = SimilarityDetector::new(config);
        let report = detector.analyze_files(&paths);
        assert_eq!(report.performance.thread_count, 2);
        assert!(report.performance.parallel_enabled);
        assert!(report.summary.clone_pairs_found >= 1);
    }
}
