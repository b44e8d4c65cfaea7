//! Report output.
//!
//! Writes finished battle reports as JSON and prints short stdout summaries.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::types::*;

/// Write reports as a pretty-printed JSON array
pub fn generate_json_report(reports: &[BattleReport], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)
        .context("Failed to serialize reports to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Print a summary of one report to stdout
pub fn print_summary(report: &BattleReport) {
    println!("\n=== BATTLE REPORT: {} ===\n", report.system_name);
    println!("URL: {}", report.url);
    println!("Time: {}", report.timestamp);
    println!("Outcome: {} ({})", report.winner, report.color);
    println!("\nTotals:");
    println!("  ISK lost: {:.2}", report.total_isk);
    println!("  Ships lost: {}", report.total_kills);
    println!("  Pilots: {}", report.total_pilots);

    for (role, team) in [("Attackers", &report.attackers), ("Defenders", &report.defenders)] {
        println!("\n{}: {}", role, team.label_with_count);
        println!("  ISK lost: {:.2}", team.isk_lost);
        println!("  Ships lost: {}", team.ships_lost);
        println!("  ISK destroyed: {:.2}", team.isk_destroyed);
        println!("  Ships destroyed: {}", team.ships_destroyed);
    }

    println!();
}

/// Print every side found by the analyzer, most involved first
pub fn print_sides(analysis: &SideAnalysis) {
    println!("\n=== SIDES ({}) ===\n", analysis.sides.len());

    for side in &analysis.sides {
        println!(
            "{:<14} {:<24} pilots={:>3} lost={:.2} ({} ships) destroyed={:.2} ({} ships)",
            side.key.to_string(),
            side.label,
            side.totals.pilot_count(),
            side.totals.isk_lost,
            side.totals.ships_lost,
            side.totals.isk_destroyed,
            side.totals.ships_destroyed
        );

        let mut victims: Vec<(&FactionKey, &Isk)> = analysis.graphs.kills_by.row(&side.key).collect();
        victims.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (victim, isk) in victims.iter().take(3) {
            println!("    killed {:<14} {:.2}", victim.to_string(), isk);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_json_report() {
        let team = Team::no_opponent().summary();
        let report = BattleReport {
            url: "https://warbeacon.net/br/report/abc/".to_string(),
            system_name: "Jita".to_string(),
            timestamp: "Combined Report".to_string(),
            total_isk: 1.5,
            total_kills: 1,
            total_pilots: 0,
            attackers: team.clone(),
            defenders: team,
            winner: Outcome::Tie,
            color: ReportColor::Grey,
        };

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports.json");
        generate_json_report(std::slice::from_ref(&report), &path).unwrap();

        let written: Vec<BattleReport> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, vec![report]);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"winner\": \"tie\""));
        assert!(raw.contains("\"color\": \"grey\""));
    }
}
