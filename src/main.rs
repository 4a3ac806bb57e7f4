//! simscan CLI - clone detection over files and directories.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use simscan::{render_text, DetectorConfig, SimilarityDetector};

/// Token-based source code clone detection.
///
/// Finds exact (Type-1), renamed (Type-2) and near-miss (Type-3)
/// duplicates across Python, JavaScript/TypeScript and C/C++ sources.
#[derive(Parser)]
#[command(name = "simscan", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a directory tree (or explicit files) for clones.
    Analyze {
        /// Directory or files to analyze.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        options: DetectorOptions,

        /// Emit the full report as JSON instead of a text summary.
        #[arg(long)]
        json: bool,
    },

    /// Compare exactly two files.
    Compare {
        file_a: PathBuf,
        file_b: PathBuf,

        #[command(flatten)]
        options: DetectorOptions,

        /// Emit the full report as JSON instead of a text summary.
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct DetectorOptions {
    /// Rolling hash window size in tokens.
    #[arg(long, default_value_t = 10)]
    window_size: usize,

    /// Minimum clone size in tokens.
    #[arg(long, default_value_t = 30)]
    min_tokens: usize,

    /// Disable Type-2 (renamed identifier) detection.
    #[arg(long)]
    no_type2: bool,

    /// Enable Type-3 (near-miss) detection.
    #[arg(long)]
    type3: bool,

    /// Similarity threshold for Type-3 extension.
    #[arg(long, default_value_t = 0.7)]
    threshold: f32,

    /// Gap budget in tokens for Type-3 extension.
    #[arg(long, default_value_t = 5)]
    max_gap: usize,

    /// Worker threads (0 = auto).
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// File extensions to analyze (defaults to all supported).
    #[arg(long, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Additional exclude globs.
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
}

impl DetectorOptions {
    fn into_config(self) -> DetectorConfig {
        let mut config = DetectorConfig::default()
            .with_window_size(self.window_size)
            .with_min_clone_tokens(self.min_tokens)
            .with_type2(!self.no_type2)
            .with_type3(self.type3)
            .with_similarity_threshold(self.threshold)
            .with_max_gap(self.max_gap)
            .with_threads(self.threads);
        if !self.extensions.is_empty() {
            config = config.with_extensions(self.extensions.iter().map(normalize_extension));
        }
        config.exclude_patterns.extend(self.exclude);
        config
    }
}

fn normalize_extension(ext: &String) -> String {
    if ext.starts_with('.') {
        ext.clone()
    } else {
        format!(".{ext}")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            paths,
            options,
            json,
        } => {
            let detector = SimilarityDetector::new(options.into_config());
            let report = if paths.len() == 1 && paths[0].is_dir() {
                detector
                    .analyze(&paths[0])
                    .with_context(|| format!("analyzing {}", paths[0].display()))?
            } else {
                detector.analyze_files(&paths)
            };
            emit(&report, json)?;
        }
        Command::Compare {
            file_a,
            file_b,
            options,
            json,
        } => {
            let detector = SimilarityDetector::new(options.into_config());
            let report = detector.compare(&file_a, &file_b);
            emit(&report, json)?;
        }
    }

    Ok(())
}

fn emit(report: &simscan::SimilarityReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}
