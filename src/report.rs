//! Analysis report: clone entries, hotspots, metrics, and timing.
//!
//! The report is the detector's only output. It is plain serde data; the
//! JSON shape belongs to the serializer, not to the detection pipeline.

use std::collections::BTreeMap;

use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::index::{ClonePair, CloneType};

// =============================================================================
// REPORT TYPES
// =============================================================================

/// One side of a reported clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneLocationInfo {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    /// First few source lines of the clone, truncated for display.
    pub snippet_preview: String,
}

/// A reported clone pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneEntry {
    pub id: String,
    /// "Type-1", "Type-2" or "Type-3".
    #[serde(rename = "type")]
    pub clone_type: String,
    pub similarity: f32,
    pub locations: Vec<CloneLocationInfo>,
    pub recommendation: String,
}

/// A file with duplicated code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicationHotspot {
    pub file_path: String,
    /// Unique duplicated lines over total lines, in [0, 1].
    pub duplication_score: f32,
    /// Clone locations involving this file.
    pub clone_count: u32,
    pub duplicated_lines: u32,
    pub total_lines: u32,
    pub recommendation: String,
}

/// Headline numbers for the analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub files_analyzed: usize,
    pub total_lines: usize,
    pub clone_pairs_found: usize,
    /// Formatted percentage, e.g. "12.5%".
    pub estimated_duplication: String,
    pub analysis_time_ms: u64,
}

/// Phase timing breakdown.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimingInfo {
    pub tokenize_ms: u64,
    pub hash_ms: u64,
    pub match_ms: u64,
    pub total_ms: u64,
}

/// Throughput numbers for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub loc_per_second: f64,
    pub total_tokens: usize,
    pub tokens_per_second: f64,
    pub files_per_second: u64,
    pub thread_count: usize,
    pub parallel_enabled: bool,
}

/// Clone counts by category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub by_type: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
}

/// Complete similarity analysis report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub summary: ReportSummary,
    pub clones: Vec<CloneEntry>,
    pub hotspots: Vec<DuplicationHotspot>,
    pub metrics: ReportMetrics,
    pub timing: TimingInfo,
    pub performance: PerformanceMetrics,
}

impl SimilarityReport {
    /// Append a clone pair, resolving file ids to paths and extracting
    /// snippets from the sources (keyed by file id).
    pub fn add_clone(
        &mut self,
        pair: &ClonePair,
        file_paths: &[String],
        sources: &FxHashMap<u32, String>,
    ) {
        let location = |file_id: u32, start_line: u32, end_line: u32| CloneLocationInfo {
            file: file_paths
                .get(file_id as usize)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            start_line,
            end_line,
            snippet_preview: extract_snippet(file_id, start_line, sources),
        };

        let entry = CloneEntry {
            id: format!("clone_{}", self.clones.len() + 1),
            clone_type: pair.clone_type.as_str().to_string(),
            similarity: pair.similarity,
            locations: vec![
                location(
                    pair.location_a.file_id,
                    pair.location_a.start_line,
                    pair.location_a.end_line,
                ),
                location(
                    pair.location_b.file_id,
                    pair.location_b.start_line,
                    pair.location_b.end_line,
                ),
            ],
            recommendation: recommendation_for(pair.clone_type).to_string(),
        };

        *self
            .metrics
            .by_type
            .entry(entry.clone_type.clone())
            .or_default() += 1;
        self.clones.push(entry);
    }

    /// Compute per-file hotspots from the accumulated clone entries.
    ///
    /// Overlapping clones in one file are deduplicated through a line set,
    /// so `duplicated_lines` counts each line once and the score stays in
    /// [0, 1]. Hotspots are sorted by score, highest first.
    pub fn calculate_hotspots(
        &mut self,
        file_paths: &[String],
        file_line_counts: &FxHashMap<u32, u32>,
    ) {
        let id_by_path: FxHashMap<&str, u32> = file_paths
            .iter()
            .enumerate()
            .map(|(i, p)| (p.as_str(), i as u32))
            .collect();

        let mut clone_counts: FxHashMap<u32, u32> = FxHashMap::default();
        let mut duplicated_line_sets: FxHashMap<u32, FxHashSet<u32>> = FxHashMap::default();

        for clone in &self.clones {
            for loc in &clone.locations {
                let Some(&file_id) = id_by_path.get(loc.file.as_str()) else {
                    continue;
                };
                *clone_counts.entry(file_id).or_default() += 1;
                let lines = duplicated_line_sets.entry(file_id).or_default();
                for line in loc.start_line..=loc.end_line {
                    lines.insert(line);
                }
            }
        }

        self.hotspots = clone_counts
            .into_iter()
            .map(|(file_id, clone_count)| {
                let duplicated_lines = duplicated_line_sets
                    .get(&file_id)
                    .map_or(0, |s| s.len() as u32);
                let total_lines = file_line_counts.get(&file_id).copied().unwrap_or(0);
                let duplication_score = if total_lines > 0 {
                    duplicated_lines as f32 / total_lines as f32
                } else {
                    0.0
                };
                DuplicationHotspot {
                    file_path: file_paths
                        .get(file_id as usize)
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string()),
                    duplication_score,
                    clone_count,
                    duplicated_lines,
                    total_lines,
                    recommendation: hotspot_recommendation(duplication_score).to_string(),
                }
            })
            .collect();

        self.hotspots.sort_by(|a, b| {
            b.duplication_score
                .partial_cmp(&a.duplication_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Fill in the summary from final counts.
    pub fn finalize(&mut self, files_analyzed: usize, total_lines: usize, analysis_time_ms: u64) {
        self.finalize_with_perf(files_analyzed, total_lines, analysis_time_ms, 0, 0, false);
    }

    /// Fill in the summary and performance metrics from final counts.
    pub fn finalize_with_perf(
        &mut self,
        files_analyzed: usize,
        total_lines: usize,
        analysis_time_ms: u64,
        total_tokens: usize,
        thread_count: usize,
        parallel_enabled: bool,
    ) {
        self.summary.files_analyzed = files_analyzed;
        self.summary.total_lines = total_lines;
        self.summary.clone_pairs_found = self.clones.len();
        self.summary.analysis_time_ms = analysis_time_ms;

        let duplicated_lines: u64 = self.hotspots.iter().map(|h| u64::from(h.duplicated_lines)).sum();
        self.summary.estimated_duplication = if total_lines > 0 {
            format!("{:.1}%", 100.0 * duplicated_lines as f64 / total_lines as f64)
        } else {
            "0.0%".to_string()
        };

        self.timing.total_ms = analysis_time_ms;

        self.performance.total_tokens = total_tokens;
        self.performance.thread_count = thread_count;
        self.performance.parallel_enabled = parallel_enabled;
        if analysis_time_ms > 0 {
            let seconds = analysis_time_ms as f64 / 1000.0;
            self.performance.loc_per_second = total_lines as f64 / seconds;
            self.performance.tokens_per_second = total_tokens as f64 / seconds;
            self.performance.files_per_second = (files_analyzed as f64 / seconds) as u64;
        }
    }
}

/// Refactoring hint per clone type.
fn recommendation_for(clone_type: CloneType) -> &'static str {
    match clone_type {
        CloneType::Type1 => "Exact duplicate found - consider extracting to shared function",
        CloneType::Type2 => "Similar code with renamed variables - consider parameterizing",
        CloneType::Type3 => "Modified clone detected - review for potential abstraction",
    }
}

/// Refactoring hint per hotspot severity.
fn hotspot_recommendation(duplication_score: f32) -> &'static str {
    if duplication_score > 0.3 {
        "High duplication - review for refactoring opportunities"
    } else {
        "Moderate duplication - consider consolidating similar code"
    }
}

/// Up to three lines of source starting at `start_line`, each truncated to
/// 60 characters, with control characters blanked for clean serialization.
fn extract_snippet(file_id: u32, start_line: u32, sources: &FxHashMap<u32, String>) -> String {
    let Some(source) = sources.get(&file_id) else {
        return "...".to_string();
    };

    let lines: Vec<String> = source
        .lines()
        .skip(start_line.saturating_sub(1) as usize)
        .take(3)
        .map(|line| {
            let mut line: String = line
                .chars()
                .map(|c| if c.is_control() && c != '\t' { ' ' } else { c })
                .collect();
            if line.chars().count() > 60 {
                line = line.chars().take(57).collect::<String>() + "...";
            }
            line
        })
        .collect();

    if lines.is_empty() {
        return "...".to_string();
    }
    lines.join("\n")
}

// =============================================================================
// TEXT RENDERING
// =============================================================================

/// Human-readable summary of a report, for terminal output.
#[must_use]
pub fn render_text(report: &SimilarityReport) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "Clone Detection Report");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Files analyzed:    {}", report.summary.files_analyzed);
    let _ = writeln!(out, "  Total lines:       {}", report.summary.total_lines);
    let _ = writeln!(out, "  Clone pairs:       {}", report.summary.clone_pairs_found);
    let _ = writeln!(
        out,
        "  Est. duplication:  {}",
        report.summary.estimated_duplication
    );
    let _ = writeln!(
        out,
        "  Analysis time:     {}ms",
        report.summary.analysis_time_ms
    );

    if !report.metrics.by_type.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Clones by type:");
        for (ty, count) in &report.metrics.by_type {
            let _ = writeln!(out, "  {ty}: {count}");
        }
    }

    if !report.clones.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top clones:");
        for clone in report.clones.iter().take(10) {
            let _ = writeln!(
                out,
                "\n{} [{}] similarity {:.2}",
                clone.id, clone.clone_type, clone.similarity
            );
            for loc in &clone.locations {
                let _ = writeln!(out, "  {}:{}-{}", loc.file, loc.start_line, loc.end_line);
            }
        }
    }

    if !report.hotspots.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Hotspots:");
        for hotspot in report.hotspots.iter().take(10) {
            let _ = writeln!(
                out,
                "  {} {:.1}% ({} of {} lines, {} clones)",
                hotspot.file_path,
                hotspot.duplication_score * 100.0,
                hotspot.duplicated_lines,
                hotspot.total_lines,
                hotspot.clone_count
            );
        }
    }

    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::HashLocation;

    fn pair(file_a: u32, file_b: u32, lines_a: (u32, u32), lines_b: (u32, u32)) -> ClonePair {
        let loc = |file_id, (start_line, end_line): (u32, u32)| HashLocation {
            file_id,
            start_line,
            end_line,
            start_col: 1,
            end_col: 10,
            token_start: 0,
            token_count: 30,
        };
        ClonePair {
            location_a: loc(file_a, lines_a),
            location_b: loc(file_b, lines_b),
            clone_type: CloneType::Type1,
            similarity: 1.0,
            shared_hash: 1,
        }
    }

    #[test]
    fn test_add_clone_ids_and_metrics() {
        let mut report = SimilarityReport::default();
        let paths = vec!["a.py".to_string(), "b.py".to_string()];
        let sources = FxHashMap::default();

        report.add_clone(&pair(0, 1, (1, 5), (10, 14)), &paths, &sources);
        report.add_clone(&pair(0, 1, (20, 25), (30, 35)), &paths, &sources);

        assert_eq!(report.clones[0].id, "clone_1");
        assert_eq!(report.clones[1].id, "clone_2");
        assert_eq!(report.metrics.by_type.get("Type-1"), Some(&2));
        assert_eq!(report.clones[0].locations[0].file, "a.py");
        assert_eq!(report.clones[0].locations[1].file, "b.py");
    }

    #[test]
    fn test_snippet_extraction() {
        let mut sources = FxHashMap::default();
        sources.insert(0u32, "line one\nline two\nline three\nline four\n".to_string());

        let snippet = extract_snippet(0, 2, &sources);
        assert_eq!(snippet, "line two\nline three\nline four");

        assert_eq!(extract_snippet(5, 1, &sources), "...");
    }

    #[test]
    fn test_snippet_truncates_long_lines() {
        let mut sources = FxHashMap::default();
        sources.insert(0u32, format!("{}\n", "x".repeat(100)));
        let snippet = extract_snippet(0, 1, &sources);
        assert_eq!(snippet.chars().count(), 60);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_hotspots_dedup_overlapping_lines() {
        let mut report = SimilarityReport::default();
        let paths = vec!["a.py".to_string(), "b.py".to_string()];
        let sources = FxHashMap::default();

        // Two clones overlapping on lines 1-5 and 3-8 of a.py.
        report.add_clone(&pair(0, 1, (1, 5), (1, 5)), &paths, &sources);
        report.add_clone(&pair(0, 1, (3, 8), (11, 16)), &paths, &sources);

        let mut line_counts = FxHashMap::default();
        line_counts.insert(0u32, 10u32);
        line_counts.insert(1u32, 20u32);
        report.calculate_hotspots(&paths, &line_counts);

        let a = report
            .hotspots
            .iter()
            .find(|h| h.file_path == "a.py")
            .unwrap();
        // Lines 1..=8, each counted once.
        assert_eq!(a.duplicated_lines, 8);
        assert!((a.duplication_score - 0.8).abs() < 1e-6);
        assert_eq!(a.clone_count, 2);
    }

    #[test]
    fn test_hotspot_recommendation_thresholds() {
        let mut report = SimilarityReport::default();
        let paths = vec!["a.py".to_string(), "b.py".to_string()];
        // Lines 1-8 of a.py are duplicated; only 1-2 of b.py.
        report.add_clone(&pair(0, 1, (1, 8), (1, 2)), &paths, &FxHashMap::default());

        let mut line_counts = FxHashMap::default();
        line_counts.insert(0u32, 10u32);
        line_counts.insert(1u32, 20u32);
        report.calculate_hotspots(&paths, &line_counts);

        let a = report
            .hotspots
            .iter()
            .find(|h| h.file_path == "a.py")
            .unwrap();
        let b = report
            .hotspots
            .iter()
            .find(|h| h.file_path == "b.py")
            .unwrap();
        // 8/10 is past the 0.3 threshold, 2/20 is not.
        assert_eq!(
            a.recommendation,
            "High duplication - review for refactoring opportunities"
        );
        assert_eq!(
            b.recommendation,
            "Moderate duplication - consider consolidating similar code"
        );
    }

    #[test]
    fn test_hotspots_sorted_descending() {
        let mut report = SimilarityReport::default();
        let paths = vec!["a.py".to_string(), "b.py".to_string()];
        let sources = FxHashMap::default();
        report.add_clone(&pair(0, 1, (1, 2), (1, 10)), &paths, &sources);

        let mut line_counts = FxHashMap::default();
        line_counts.insert(0u32, 100u32);
        line_counts.insert(1u32, 20u32);
        report.calculate_hotspots(&paths, &line_counts);

        assert_eq!(report.hotspots[0].file_path, "b.py");
        assert!(
            report.hotspots[0].duplication_score >= report.hotspots[1].duplication_score
        );
    }

    #[test]
    fn test_finalize_percentages() {
        let mut report = SimilarityReport::default();
        report.hotspots.push(DuplicationHotspot {
            file_path: "a.py".to_string(),
            duplication_score: 0.5,
            clone_count: 1,
            duplicated_lines: 50,
            total_lines: 100,
            recommendation: hotspot_recommendation(0.5).to_string(),
        });
        report.finalize(1, 400, 100);
        assert_eq!(report.summary.estimated_duplication, "12.5%");
        assert_eq!(report.summary.analysis_time_ms, 100);
        assert_eq!(report.timing.total_ms, 100);
    }

    #[test]
    fn test_finalize_empty() {
        let mut report = SimilarityReport::default();
        report.finalize(0, 0, 0);
        assert_eq!(report.summary.estimated_duplication, "0.0%");
        assert_eq!(report.summary.clone_pairs_found, 0);
    }

    #[test]
    fn test_json_shape() {
        let mut report = SimilarityReport::default();
        let paths = vec!["a.py".to_string(), "b.py".to_string()];
        report.add_clone(&pair(0, 1, (1, 5), (1, 5)), &paths, &FxHashMap::default());
        report.finalize(2, 100, 10);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["summary"]["files_analyzed"].is_number());
        assert_eq!(json["clones"][0]["type"], "Type-1");
        assert!(json["clones"][0]["locations"].is_array());
        assert!(json["timing"]["total_ms"].is_number());
    }

    #[test]
    fn test_render_text_contains_summary() {
        let mut report = SimilarityReport::default();
        report.finalize(3, 300, 42);
        let text = render_text(&report);
        assert!(text.contains("Files analyzed:    3"));
        assert!(text.contains("42ms"));
    }
}
