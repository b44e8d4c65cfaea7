//! Battle report CLI.
//!
//! Builds attacker/defender summaries from saved WarBeacon API responses.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Context, Result};
use env_logger::Env;
use log::{info, warn};
use rayon::prelude::*;

use beacon::analysis::{self, BattleReport};
use beacon::config::{self, Config};
use beacon::payload::{self, ReportSource};
use beacon::service::{build_report, ReportService};

#[derive(Parser, Debug)]
#[command(name = "beacon")]
#[command(about = "Side attribution and team summaries for WarBeacon battle reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML configuration file (environment variables still apply)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build battle reports from saved API responses
    Report {
        /// Saved API response files (JSON)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Treat inputs as a related report: <SYSTEM_ID>:<YYYYMMDDHHMM>
        #[arg(long)]
        related: Option<String>,

        /// Report URL (only with a single input; defaults to the input path)
        #[arg(long)]
        url: Option<String>,

        /// Write all reports to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show every side found in one saved API response
    Sides {
        /// Saved API response file (JSON)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => config::load_config(path)?,
        None => Config::default(),
    };
    config.apply_env(|name| std::env::var(name).ok());
    config.validate()?;

    // Side dumps are logged at debug level
    let log_level = if config.debug_sides { "debug" } else { cli.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    if config.preferred.is_empty() {
        info!("No preferred sides configured, all reports are neutral");
    } else {
        info!(
            "Preferred alliances: {:?}, corporations: {:?}",
            config.preferred.alliances, config.preferred.corporations
        );
    }

    match cli.command {
        Commands::Report {
            inputs,
            related,
            url,
            output,
        } => {
            if url.is_some() && inputs.len() > 1 {
                bail!("--url can only be used with a single input");
            }
            let related = related
                .as_deref()
                .map(ReportSource::parse_related)
                .transpose()?;
            if let Some(source @ ReportSource::Related { system_id, .. }) = &related {
                info!(
                    "Related report for system {} around {}",
                    system_id,
                    source.middle_time().unwrap_or_default()
                );
            }

            let mut service = ReportService::new(config);
            let reports = run_reports(&mut service, &inputs, related.as_ref(), url.as_deref())?;

            for report in &reports {
                analysis::print_summary(report);
            }
            if let Some(output) = output {
                analysis::generate_json_report(&reports, &output)?;
            }
        }
        Commands::Sides { input } => {
            let raw = read_input(&input)?;
            let data = payload::parse_response(&raw)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            let side_analysis = analysis::analyze_killmails(&data.killmails, &data.names);
            analysis::report::print_sides(&side_analysis);
        }
    }

    Ok(())
}

/// One input file and the URL its report is keyed by
struct PendingInput {
    url: String,
    source: ReportSource,
    raw: String,
}

/// Build reports for every input, in input order.
///
/// Inputs sharing a URL are built once; building runs in parallel. Output
/// does not depend on what the service cache still holds.
fn run_reports(
    service: &mut ReportService,
    inputs: &[PathBuf],
    related: Option<&ReportSource>,
    url: Option<&str>,
) -> Result<Vec<BattleReport>> {
    let urls: Vec<String> = inputs
        .iter()
        .map(|path| url.map_or_else(|| path.display().to_string(), str::to_string))
        .collect();

    let mut reports: HashMap<String, BattleReport> = HashMap::new();
    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    for (path, url) in inputs.iter().zip(&urls) {
        if !seen.insert(url.clone()) {
            continue;
        }
        if let Some(report) = service.cached(url) {
            reports.insert(url.clone(), report);
            continue;
        }
        let source = related
            .cloned()
            .unwrap_or_else(|| ReportSource::Combined { report_id: report_id(path) });
        pending.push(PendingInput {
            url: url.clone(),
            source,
            raw: read_input(path)?,
        });
    }

    info!("Building {} report(s) from {} input(s)", pending.len(), inputs.len());
    let config = service.config().clone();
    let built: Vec<Result<Option<BattleReport>, payload::PayloadError>> = pending
        .par_iter()
        .map(|input| build_report(&input.url, &input.source, &input.raw, &config))
        .collect();

    for (input, result) in pending.iter().zip(built) {
        match result.with_context(|| format!("Failed to build report for {}", input.url))? {
            Some(report) => {
                service.remember(report.clone());
                reports.insert(input.url.clone(), report);
            }
            None => warn!("Nothing to report for {}", input.url),
        }
    }

    Ok(urls.iter().filter_map(|url| reports.get(url).cloned()).collect())
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read input file: {}", path.display()))
}

/// Combined reports are identified by the file stem of the saved response
fn report_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon::config::PreferredSides;
    use std::collections::BTreeSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RAW: &str = r#"{
        "success": true,
        "data": {
            "killmails": [{
                "total_value": 250.0,
                "victim": {"alliance_id": 1, "character_id": 10},
                "attackers": [{"alliance_id": 2, "character_id": 20, "final_blow": true}]
            }],
            "locations": [{"name": "Amamake"}]
        }
    }"#;

    fn input_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    fn neutral_service() -> ReportService {
        let mut config = Config::default();
        config.preferred.alliances = BTreeSet::new();
        config.preferred.corporations = BTreeSet::new();
        ReportService::new(config)
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["beacon", "report", "a.json", "b.json"]);
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.threads, 0);
        match cli.command {
            Commands::Report { inputs, related, url, output } => {
                assert_eq!(inputs, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
                assert!(related.is_none());
                assert!(url.is_none());
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_related_args() {
        let cli = Cli::parse_from([
            "beacon",
            "--config", "beacon.yaml",
            "report", "br.json",
            "--related", "30000142:202512030400",
            "--output", "out.json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("beacon.yaml")));
        match cli.command {
            Commands::Report { related, output, .. } => {
                assert_eq!(related.as_deref(), Some("30000142:202512030400"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_report_requires_inputs() {
        assert!(Cli::try_parse_from(["beacon", "report"]).is_err());
    }

    #[test]
    fn test_run_reports_dedupes_inputs() {
        let file = input_file(RAW);
        let path = file.path().to_path_buf();
        let mut service = neutral_service();

        let reports = run_reports(&mut service, &[path.clone(), path], None, None).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], reports[1]);
        assert_eq!(reports[0].system_name, "Amamake");
        assert_eq!(reports[0].timestamp, "Combined Report");
    }

    #[test]
    fn test_run_reports_skips_empty_battles() {
        let empty = input_file(r#"{"success": true, "data": {"killmails": []}}"#);
        let full = input_file(RAW);
        let mut service = neutral_service();

        let inputs = [empty.path().to_path_buf(), full.path().to_path_buf()];
        let reports = run_reports(&mut service, &inputs, None, None).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].total_isk, 250.0);
    }

    #[test]
    fn test_run_reports_outlives_small_cache() {
        let files: Vec<NamedTempFile> = (0..3).map(|_| input_file(RAW)).collect();
        let inputs: Vec<PathBuf> = files.iter().map(|f| f.path().to_path_buf()).collect();

        let mut config = Config::default();
        config.preferred = PreferredSides::default();
        config.cache.max_entries = 2;
        let mut service = ReportService::new(config);

        let reports = run_reports(&mut service, &inputs, None, None).unwrap();
        assert_eq!(reports.len(), 3);
        for (report, input) in reports.iter().zip(&inputs) {
            assert_eq!(report.url, input.display().to_string());
        }
    }

    #[test]
    fn test_run_reports_mixes_cached_and_built() {
        let first = input_file(RAW);
        let second = input_file(RAW);
        let mut service = neutral_service();

        let inputs = [first.path().to_path_buf()];
        run_reports(&mut service, &inputs, None, None).unwrap();

        let inputs = [first.path().to_path_buf(), second.path().to_path_buf()];
        let reports = run_reports(&mut service, &inputs, None, None).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].url, first.path().display().to_string());
        assert_eq!(reports[1].url, second.path().display().to_string());
    }

    #[test]
    fn test_run_reports_fails_on_bad_payload() {
        let bad = input_file(r#"{"success": false}"#);
        let mut service = neutral_service();
        assert!(run_reports(&mut service, &[bad.path().to_path_buf()], None, None).is_err());
    }

    #[test]
    fn test_run_reports_with_url_and_related_source() {
        let file = input_file(RAW);
        let mut service = neutral_service();
        let related = ReportSource::parse_related("30000142:202512030400").unwrap();

        let reports = run_reports(
            &mut service,
            &[file.path().to_path_buf()],
            Some(&related),
            Some("https://warbeacon.net/br/related/30000142/202512030400/"),
        )
        .unwrap();
        assert_eq!(reports[0].url, "https://warbeacon.net/br/related/30000142/202512030400/");
        assert_eq!(reports[0].timestamp, "12/03/2025");
    }
}
