//! End-to-end pipeline tests covering the canonical clone scenarios.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use simscan::{
    DetectorConfig, HashIndex, HashIndexBuilder, Language, SimilarityDetector,
};

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// A Python function with comfortably more than 60 significant tokens,
/// varied enough that no window repeats inside it.
fn fixture_function(name: &str, acc: &str) -> String {
    format!(
        "def {name}(items, limit):\n\
         \x20   {acc} = []\n\
         \x20   skipped = 0\n\
         \x20   for index, item in enumerate(items):\n\
         \x20       if item > limit:\n\
         \x20           {acc}.append(item * 2 + index)\n\
         \x20       elif item < 0:\n\
         \x20           skipped += 1\n\
         \x20       else:\n\
         \x20           {acc}.append(item - limit)\n\
         \x20   total = sum({acc})\n\
         \x20   average = total / max(len({acc}), 1)\n\
         \x20   return average, skipped\n"
    )
}

// =============================================================================
// Scenario 1: exact duplicate
// =============================================================================

#[test]
fn test_exact_duplicate_single_type1_pair() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.py", &fixture_function("process", "values"));
    let b = write(&dir, "b.py", &fixture_function("process", "values"));

    let detector = SimilarityDetector::with_defaults();
    let report = detector.compare(&a, &b);

    assert_eq!(report.summary.clone_pairs_found, 1, "one merged pair");
    let clone = &report.clones[0];
    assert_eq!(clone.clone_type, "Type-1");
    assert!((clone.similarity - 1.0).abs() < f32::EPSILON);

    // The pair covers the whole function on both sides.
    assert_eq!(clone.locations[0].start_line, 1);
    assert!(clone.locations[0].end_line >= 12);
    assert_eq!(clone.locations[1].start_line, 1);
}

// =============================================================================
// Scenario 2: renamed variables
// =============================================================================

#[test]
fn test_renamed_single_type2_pair() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.py", &fixture_function("process", "values"));
    let b = write(&dir, "b.py", &fixture_function("transform", "buffer"));

    let detector = SimilarityDetector::with_defaults();
    let report = detector.compare(&a, &b);

    assert_eq!(report.summary.clone_pairs_found, 1);
    let clone = &report.clones[0];
    assert_eq!(clone.clone_type, "Type-2");
    assert!((clone.similarity - 1.0).abs() < f32::EPSILON);
}

// =============================================================================
// Scenario 3: inserted tokens (Type-3)
// =============================================================================

#[test]
fn test_inserted_tokens_type3_pair() {
    let base = fixture_function("process", "values");
    // Insert one extra statement (3 significant tokens) mid-function.
    let modified = base.replace(
        "    total = sum(values)\n",
        "    checkpoint = 7\n    total = sum(values)\n",
    );
    assert_ne!(base, modified);

    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.py", &base);
    let b = write(&dir, "b.py", &modified);

    let config = DetectorConfig::default()
        .with_type3(true)
        .with_max_gap(5)
        .with_similarity_threshold(0.7);
    let detector = SimilarityDetector::new(config);
    let report = detector.compare(&a, &b);

    assert_eq!(report.summary.clone_pairs_found, 1);
    let clone = &report.clones[0];
    assert_eq!(clone.clone_type, "Type-3");
    assert!(clone.similarity >= 0.7);
    assert!(clone.similarity < 1.0);
}

// =============================================================================
// Scenario 4: overlap suppression with repeated blocks in one file
// =============================================================================

#[test]
fn test_triple_block_pairwise_pairs_no_self_overlap() {
    // Three copies of one block, separated by unique code so only the
    // block windows collide.
    let block = "result = alpha + beta * gamma\nflags = check(result, DELTA)\nemit(result, flags)\n";
    let source = format!(
        "{block}marker_one = 111\n{block}marker_two = 222\n{block}marker_three = 333\n"
    );

    let mut file = Language::Python.tokenize(&source);
    file.path = PathBuf::from("triple.py");
    let block_tokens = Language::Python.tokenize(block).significant().len();

    // Index original hashes so the distinct markers between copies break
    // the periodicity and only the three whole-block windows collide.
    let mut builder = HashIndexBuilder::new(block_tokens);
    builder.add_file(&file, false);
    let index = builder.finish();

    let pairs = index.find_clone_pairs();
    assert_eq!(pairs.len(), 3, "C(3,2) pairwise clones");

    for pair in &pairs {
        // Same file on both sides, but never the same token range.
        assert_eq!(pair.location_a.file_id, pair.location_b.file_id);
        assert_ne!(pair.location_a.token_start, pair.location_b.token_start);
        // And never overlapping line ranges.
        assert!(!pair.location_a.overlaps(&pair.location_b));
    }
}

// =============================================================================
// Scenario 5: adjacency merging
// =============================================================================

#[test]
fn test_adjacent_pairs_merge_across_small_gap() {
    use simscan::{ClonePair, CloneType, HashLocation};

    let loc = |file_id: u32, token_start: u32, line: u32| HashLocation {
        file_id,
        start_line: line,
        end_line: line + 9,
        start_col: 1,
        end_col: 20,
        token_start,
        token_count: 30,
    };
    let pair = |start_a: u32, start_b: u32| ClonePair {
        location_a: loc(0, start_a, start_a / 3 + 1),
        location_b: loc(1, start_b, start_b / 3 + 1),
        clone_type: CloneType::Type1,
        similarity: 1.0,
        shared_hash: 99,
    };

    // B-sides 3 tokens apart.
    let merged = HashIndex::merge_adjacent_clones(vec![pair(0, 0), pair(33, 33)], 5);
    assert_eq!(merged.len(), 1);
    assert!(merged[0].token_count() >= 63);
}

// =============================================================================
// Scenario 6: parallel determinism
// =============================================================================

#[test]
fn test_parallel_enumeration_matches_sequential() {
    // Many files sharing a long common section produce well over a hundred
    // duplicate hashes, enough to engage the parallel path.
    let dir = TempDir::new().unwrap();
    let shared = format!(
        "{}\n{}",
        fixture_function("shared_helper", "values"),
        fixture_function("shared_reducer", "buffer")
    );
    let mut paths = Vec::new();
    for i in 0..12 {
        let source = format!("{shared}\ndef unique_{i}():\n    return {i} * {i}\n");
        paths.push(write(&dir, &format!("mod_{i:02}.py"), &source));
    }

    let mut tokenized_files = Vec::new();
    for path in &paths {
        let mut tokenized = Language::Python.tokenize(&fs::read_to_string(path).unwrap());
        tokenized.path = path.clone();
        tokenized_files.push(tokenized);
    }

    let mut builder = HashIndexBuilder::new(10);
    for tokenized in &tokenized_files {
        builder.add_file(tokenized, true);
    }
    let index = builder.finish();

    let mut sequential = index.find_clone_pairs();
    let mut parallel = index.find_clone_pairs_parallel();
    assert_eq!(sequential.len(), parallel.len());

    let key = |p: &simscan::ClonePair| {
        (
            p.shared_hash,
            p.location_a.file_id,
            p.location_a.token_start,
            p.location_b.file_id,
            p.location_b.token_start,
        )
    };
    sequential.sort_by_key(key);
    parallel.sort_by_key(key);
    let seq_keys: Vec<_> = sequential.iter().map(key).collect();
    let par_keys: Vec<_> = parallel.iter().map(key).collect();
    assert_eq!(seq_keys, par_keys);

    // The end-to-end report over the same inputs is reproducible.
    let detector = SimilarityDetector::with_defaults();
    let first = detector.analyze_files(&paths);
    let second = detector.analyze_files(&paths);
    assert_eq!(
        first.summary.clone_pairs_found,
        second.summary.clone_pairs_found
    );
    for (x, y) in first.clones.iter().zip(&second.clones) {
        assert_eq!(x.clone_type, y.clone_type);
        assert_eq!(x.locations[0].file, y.locations[0].file);
        assert_eq!(x.locations[0].start_line, y.locations[0].start_line);
    }
}

// =============================================================================
// Boundary behaviors
// =============================================================================

#[test]
fn test_empty_directory_empty_report() {
    let dir = TempDir::new().unwrap();
    let detector = SimilarityDetector::with_defaults();
    let report = detector.analyze(dir.path()).unwrap();

    assert_eq!(report.summary.files_analyzed, 0);
    assert_eq!(report.summary.clone_pairs_found, 0);
    assert_eq!(report.summary.estimated_duplication, "0.0%");
    assert!(report.clones.is_empty());
    assert!(report.hotspots.is_empty());
}

#[test]
fn test_all_unique_content_no_pairs() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.py", "def one():\n    return 'alpha and omega'\n");
    let b = write(&dir, "b.py", "class Widget:\n    size = 42\n");

    let detector = SimilarityDetector::with_defaults();
    let report = detector.analyze_files(&[a, b]);
    assert_eq!(report.summary.clone_pairs_found, 0);
    assert_eq!(report.summary.files_analyzed, 2);
}

#[test]
fn test_cross_language_analysis() {
    let dir = TempDir::new().unwrap();
    let py = write(&dir, "a.py", &fixture_function("process", "values"));
    let js = write(
        &dir,
        "b.js",
        "function process(items) {\n  return items.map((x) => x * 2);\n}\n",
    );
    let cpp = write(
        &dir,
        "c.cpp",
        "#include <vector>\nint process(int x) {\n    return x * 2;\n}\n",
    );

    let detector = SimilarityDetector::with_defaults();
    let report = detector.analyze_files(&[py, js, cpp]);
    // All three files tokenize; no cross-language pair is expected from
    // such different shapes.
    assert_eq!(report.summary.files_analyzed, 3);
}

#[test]
fn test_exclude_patterns_respected() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("vendor")).unwrap();
    write(&dir, "a.py", &fixture_function("process", "values"));
    fs::write(
        dir.path().join("vendor/copy.py"),
        fixture_function("process", "values"),
    )
    .unwrap();

    let detector = SimilarityDetector::with_defaults();
    let report = detector.analyze(dir.path()).unwrap();
    // The vendor copy is excluded, so nothing is left to pair with.
    assert_eq!(report.summary.files_analyzed, 1);
    assert_eq!(report.summary.clone_pairs_found, 0);
}
