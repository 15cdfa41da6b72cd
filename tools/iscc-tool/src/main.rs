use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use iscc_common::codec::{self, Explanation};
use iscc_common::compare::{self, UnitComparison};
use iscc_common::error::Error;
use iscc_common::metrics::{self, MatchBand};
use iscc_common::rank::{self, BatchRankResult};

#[derive(Parser)]
#[command(name = "iscc-tool")]
#[command(about = "Decode, compare and rank ISCC identifiers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two identifiers unit by unit
    Compare {
        /// First identifier
        iscc_a: String,
        /// Second identifier
        iscc_b: String,
        /// Human-readable output instead of JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Hamming distance between identifiers, single pair or batch
    Distance {
        /// Reference identifier
        iscc_a: String,
        /// Second identifier (omit in batch mode)
        iscc_b: Option<String>,
        /// Similarity threshold percentage (0-100)
        #[arg(long, value_name = "PCT")]
        threshold: Option<f64>,
        /// Compare against identifiers from a file, one per line
        #[arg(long, value_name = "FILE")]
        batch: Option<PathBuf>,
        /// Human-readable output instead of JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Decompose an identifier and explain its units
    Inspect {
        /// Identifier to inspect
        iscc: String,
        /// Include hexadecimal digest of each unit
        #[arg(long)]
        hex: bool,
        /// Include binary digest of each unit
        #[arg(long)]
        binary: bool,
        /// Human-readable output instead of JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Check an identifier for structural validity
    Validate {
        /// Identifier to validate
        iscc: String,
        /// Human-readable output instead of JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Serialize)]
struct CompareReport {
    iscc_a: String,
    iscc_b: String,
    hamming_distance: u32,
    similarity_percentage: f64,
    units_a: Vec<String>,
    units_b: Vec<String>,
    types: BTreeMap<String, UnitComparison>,
    score: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    degenerate: Vec<String>,
}

#[derive(Serialize)]
struct DistanceReport {
    iscc_a: String,
    iscc_b: String,
    hamming_distance: u32,
    total_bits: u32,
    matching_bits: u32,
    similarity_percentage: f64,
    assessment: MatchBand,
    #[serde(skip_serializing_if = "Option::is_none")]
    meets_threshold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<f64>,
}

#[derive(Serialize)]
struct UnitDetail {
    iscc: String,
    explanation: Explanation,
    #[serde(skip_serializing_if = "Option::is_none")]
    hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    binary: Option<String>,
}

#[derive(Serialize)]
struct InspectReport {
    iscc: String,
    explanation: Explanation,
    unit_count: usize,
    units: Vec<UnitDetail>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compare {
            iscc_a,
            iscc_b,
            pretty,
        } => run_compare(&iscc_a, &iscc_b, pretty),
        Commands::Distance {
            iscc_a,
            iscc_b,
            threshold,
            batch,
            pretty,
        } => run_distance(&iscc_a, iscc_b.as_deref(), threshold, batch, pretty),
        Commands::Inspect {
            iscc,
            hex,
            binary,
            pretty,
        } => run_inspect(&iscc, hex, binary, pretty),
        Commands::Validate { iscc, pretty } => run_validate(&iscc, pretty),
    }
}

fn run_compare(iscc_a: &str, iscc_b: &str, pretty: bool) -> ExitCode {
    let report = match build_compare_report(iscc_a, iscc_b) {
        Ok(report) => report,
        Err(err) => return emit_error(iscc_a, iscc_b, &err, pretty),
    };
    if pretty {
        println!("{}", render_compare(&report));
    } else {
        print_json(&report);
    }
    ExitCode::SUCCESS
}

fn build_compare_report(iscc_a: &str, iscc_b: &str) -> Result<CompareReport, Error> {
    let comparison = compare::compare(iscc_a, iscc_b)?;
    let distance = metrics::code_distance(iscc_a, iscc_b, None)?;
    Ok(CompareReport {
        iscc_a: iscc_a.to_string(),
        iscc_b: iscc_b.to_string(),
        hamming_distance: distance.hamming_distance,
        similarity_percentage: distance.similarity_percentage,
        units_a: codec::decompose(iscc_a)?,
        units_b: codec::decompose(iscc_b)?,
        types: comparison.types,
        score: comparison.score,
        degenerate: comparison.degenerate,
    })
}

fn run_distance(
    iscc_a: &str,
    iscc_b: Option<&str>,
    threshold: Option<f64>,
    batch: Option<PathBuf>,
    pretty: bool,
) -> ExitCode {
    if let Some(t) = threshold {
        if !(0.0..=100.0).contains(&t) {
            eprintln!("Error: threshold must be between 0 and 100");
            return ExitCode::from(2);
        }
    }

    if let Some(path) = batch {
        let candidates = match read_candidates(&path) {
            Ok(candidates) => candidates,
            Err(err) => {
                eprintln!("Error: {err}");
                return ExitCode::from(2);
            }
        };
        debug!(
            candidates = candidates.len(),
            file = %path.display(),
            "running batch distance"
        );
        let result = match rank::rank(iscc_a, &candidates, threshold) {
            Ok(result) => result,
            Err(err) => return emit_single_error(iscc_a, &err, pretty),
        };
        debug!(
            ranked = result.ranked.len(),
            errors = result.errors.len(),
            "batch distance finished"
        );
        if pretty {
            println!("{}", render_batch(&result));
        } else {
            print_json(&result);
        }
        return ExitCode::SUCCESS;
    }

    let Some(iscc_b) = iscc_b else {
        eprintln!("Error: second identifier required for single comparison (or use --batch)");
        return ExitCode::from(2);
    };
    let result = match metrics::code_distance(iscc_a, iscc_b, threshold) {
        Ok(result) => result,
        Err(err) => return emit_error(iscc_a, iscc_b, &err, pretty),
    };
    let report = DistanceReport {
        iscc_a: iscc_a.to_string(),
        iscc_b: iscc_b.to_string(),
        hamming_distance: result.hamming_distance,
        total_bits: result.total_bits,
        matching_bits: result.matching_bits,
        similarity_percentage: result.similarity_percentage,
        assessment: result.assessment,
        meets_threshold: result.meets_threshold,
        threshold,
    };
    if pretty {
        println!("{}", render_distance(&report));
    } else {
        print_json(&report);
    }
    ExitCode::SUCCESS
}

fn run_inspect(iscc: &str, hex: bool, binary: bool, pretty: bool) -> ExitCode {
    let report = match build_inspect_report(iscc, hex, binary) {
        Ok(report) => report,
        Err(err) => return emit_single_error(iscc, &err, pretty),
    };
    if pretty {
        println!("{}", render_inspect(&report));
    } else {
        print_json(&report);
    }
    ExitCode::SUCCESS
}

fn build_inspect_report(iscc: &str, hex: bool, binary: bool) -> Result<InspectReport, Error> {
    let decoded = codec::decode(iscc)?;
    let explanation = codec::explain(iscc)?;

    let mut units = Vec::with_capacity(decoded.units().len());
    for unit in decoded.units() {
        let unit_code = unit.encode();
        let unit_explanation = codec::explain(&unit_code)?;
        units.push(UnitDetail {
            hex: hex.then(|| unit_explanation.digest.clone()),
            binary: binary.then(|| render_binary(unit.payload())),
            iscc: unit_code,
            explanation: unit_explanation,
        });
    }
    Ok(InspectReport {
        iscc: decoded.iscc().to_string(),
        explanation,
        unit_count: units.len(),
        units,
    })
}

fn run_validate(iscc: &str, pretty: bool) -> ExitCode {
    let report = codec::validate(iscc);
    if pretty {
        println!("{}", render_validate(&report));
    } else {
        print_json(&report);
    }
    if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// One candidate per line; blank lines are ignored.
fn read_candidates(path: &Path) -> Result<Vec<String>, std::io::Error> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn render_binary(payload: &[u8]) -> String {
    let mut out = String::with_capacity(2 + payload.len() * 8);
    out.push_str("0b");
    for byte in payload {
        out.push_str(&format!("{byte:08b}"));
    }
    out
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("Error: failed to serialize output: {err}"),
    }
}

fn emit_error(iscc_a: &str, iscc_b: &str, err: &Error, pretty: bool) -> ExitCode {
    if pretty {
        println!("ERROR: {err}");
    } else {
        let payload = serde_json::json!({
            "error": err.to_string(),
            "iscc_a": iscc_a,
            "iscc_b": iscc_b,
        });
        print_json(&payload);
    }
    ExitCode::FAILURE
}

fn emit_single_error(iscc: &str, err: &Error, pretty: bool) -> ExitCode {
    if pretty {
        println!("ERROR: {err}");
    } else {
        let payload = serde_json::json!({
            "error": err.to_string(),
            "iscc": iscc,
        });
        print_json(&payload);
    }
    ExitCode::FAILURE
}

fn render_compare(report: &CompareReport) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(60));
    lines.push("ISCC Comparison Results".to_string());
    lines.push("=".repeat(60));
    lines.push(format!("ISCC A: {}", report.iscc_a));
    lines.push(format!("ISCC B: {}", report.iscc_b));
    lines.push("-".repeat(60));
    lines.push(format!("Hamming Distance: {}", report.hamming_distance));
    lines.push(format!("Similarity: {}%", report.similarity_percentage));
    lines.push("-".repeat(60));
    lines.push(format!("Units in A: {}", report.units_a.len()));
    for (i, unit) in report.units_a.iter().enumerate() {
        lines.push(format!("  {}. {unit}", i + 1));
    }
    lines.push(format!("Units in B: {}", report.units_b.len()));
    for (i, unit) in report.units_b.iter().enumerate() {
        lines.push(format!("  {}. {unit}", i + 1));
    }
    lines.push("-".repeat(60));
    if report.types.is_empty() {
        lines.push("No compatible units to compare".to_string());
    } else {
        for (name, outcome) in &report.types {
            match outcome {
                UnitComparison::Match { matched } => {
                    let verdict = if *matched { "match" } else { "no match" };
                    lines.push(format!("  {name}: {verdict}"));
                }
                UnitComparison::Similarity(sim) => {
                    lines.push(format!(
                        "  {name}: score={:.4} distance={} bits={}",
                        sim.score, sim.distance, sim.bits
                    ));
                }
            }
        }
    }
    for name in &report.degenerate {
        lines.push(format!("  {name}: no shared bits (not scored)"));
    }
    let overall = report
        .score
        .map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}"));
    lines.push(format!("OVERALL score: {overall}"));
    lines.push("=".repeat(60));
    lines.join("\n")
}

fn render_distance(report: &DistanceReport) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(70));
    lines.push("ISCC Hamming Distance Calculation".to_string());
    lines.push("=".repeat(70));
    lines.push(format!("ISCC A: {}", report.iscc_a));
    lines.push(format!("ISCC B: {}", report.iscc_b));
    lines.push("-".repeat(70));
    lines.push(format!("Hamming Distance: {}", report.hamming_distance));
    lines.push(format!("Total Bits: {}", report.total_bits));
    lines.push(format!("Matching Bits: {}", report.matching_bits));
    lines.push(format!("Similarity: {}%", report.similarity_percentage));
    lines.push(format!("Assessment: {}", report.assessment));
    if let (Some(meets), Some(threshold)) = (report.meets_threshold, report.threshold) {
        let status = if meets { "YES" } else { "NO" };
        lines.push(format!("Meets Threshold ({threshold}%): {status}"));
    }
    lines.push("=".repeat(70));
    lines.join("\n")
}

fn render_batch(result: &BatchRankResult) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(70));
    lines.push("ISCC Batch Distance Comparison".to_string());
    lines.push("=".repeat(70));
    lines.push(format!("Reference ISCC: {}", result.reference));
    lines.push(format!("Total Candidates: {}", result.total_candidates));
    if let (Some(threshold), Some(count)) = (result.threshold, result.matches_above_threshold) {
        lines.push(format!("Threshold: {threshold}%"));
        lines.push(format!("Matches Above Threshold: {count}"));
    }
    lines.push("-".repeat(70));
    if let Some(best) = &result.best_match {
        lines.push("Best Match:".to_string());
        lines.push(format!("  ISCC: {}", best.iscc));
        lines.push(format!("  Distance: {}", best.metrics.hamming_distance));
        lines.push(format!(
            "  Similarity: {}%",
            best.metrics.similarity_percentage
        ));
        lines.push(format!("  Assessment: {}", best.metrics.assessment));
        lines.push("-".repeat(70));
    }
    lines.push(String::new());
    lines.push("All Comparisons (sorted by similarity):".to_string());
    for (i, ranked) in result.ranked.iter().enumerate() {
        let status = match ranked.metrics.meets_threshold {
            Some(true) => " ✓",
            Some(false) => " ✗",
            None => "",
        };
        lines.push(String::new());
        lines.push(format!("{}. {}{status}", i + 1, ranked.iscc));
        lines.push(format!(
            "   Distance: {} | Similarity: {}% | {}",
            ranked.metrics.hamming_distance,
            ranked.metrics.similarity_percentage,
            ranked.metrics.assessment
        ));
    }
    for error in &result.errors {
        lines.push(String::new());
        lines.push(format!("SKIPPED {}: {}", error.iscc, error.error));
    }
    lines.push("=".repeat(70));
    lines.join("\n")
}

fn render_inspect(report: &InspectReport) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(70));
    lines.push("ISCC Inspection Report".to_string());
    lines.push("=".repeat(70));
    lines.push(format!("ISCC Code: {}", report.iscc));
    lines.push("-".repeat(70));
    lines.push("Overall Structure:".to_string());
    lines.push(format!("  maintype: {}", report.explanation.maintype));
    lines.push(format!("  subtype: {}", report.explanation.subtype));
    lines.push(format!("  version: {}", report.explanation.version));
    lines.push(format!("  bits: {}", report.explanation.bits));
    lines.push("-".repeat(70));
    lines.push(format!("Units: {}", report.unit_count));
    for (i, unit) in report.units.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("Unit {}: {}", i + 1, unit.iscc));
        lines.push(format!(
            "  {}-{}-V{}-{}",
            unit.explanation.maintype,
            unit.explanation.subtype,
            unit.explanation.version,
            unit.explanation.bits
        ));
        if let Some(hex) = &unit.hex {
            lines.push(format!("  Hex: {hex}"));
        }
        if let Some(binary) = &unit.binary {
            lines.push(format!("  Binary: {binary}"));
        }
    }
    lines.push("=".repeat(70));
    lines.join("\n")
}

fn render_validate(report: &codec::ValidationReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!("ISCC: {}", report.iscc));
    lines.push(format!(
        "Valid: {}",
        if report.valid { "yes" } else { "no" }
    ));
    for error in &report.errors {
        lines.push(format!("Error: {error}"));
    }
    if report.valid {
        lines.push(format!("Units: {}", report.unit_count));
        for (i, unit) in report.units.iter().enumerate() {
            lines.push(format!("  {}. {unit}", i + 1));
        }
    }
    lines.join("\n")
}
