//! Team building.
//!
//! Folds the many sides of a battle into two opposing teams. When the
//! configured home side took part the report is written from its point of
//! view; otherwise the two most involved sides anchor a neutral report.
//!
//! Minor sides join a team by engagement: a side that only fought one anchor
//! joins the other anchor's team. Sides that fought both anchors, or neither,
//! are third parties and stay out of both teams (they still count towards the
//! grand totals).

use std::cmp::Ordering;
use std::collections::BTreeSet;

use log::{debug, warn};

use super::graph::SideGraphs;
use super::types::*;
use crate::config::PreferredSides;

/// Which anchor a minor side fought against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    /// Fought the first anchor only, so sides with the second
    AgainstFirst,
    /// Fought the second anchor only, so sides with the first
    AgainstSecond,
    /// Fought both anchors or neither
    ThirdParty,
}

fn alignment(
    graphs: &SideGraphs,
    side: &FactionKey,
    first: &[FactionKey],
    second: &[FactionKey],
) -> Alignment {
    let engage_first = graphs.engagement(side, first);
    let engage_second = graphs.engagement(side, second);

    if engage_first > 0.0 && engage_second == 0.0 {
        Alignment::AgainstFirst
    } else if engage_second > 0.0 && engage_first == 0.0 {
        Alignment::AgainstSecond
    } else {
        Alignment::ThirdParty
    }
}

struct Matchup {
    attackers: Team,
    defenders: Team,
    winner: Outcome,
    color: ReportColor,
}

/// Build a battle report from analyzed side data.
///
/// Returns `None` when the analysis found no sides at all. With `debug_sides`
/// the raw sides and final teams are written to the debug log.
pub fn build_battle_report(
    url: &str,
    system_name: &str,
    timestamp: &str,
    analysis: &SideAnalysis,
    preferred: &PreferredSides,
    debug_sides: bool,
) -> Option<BattleReport> {
    let sides = &analysis.sides;
    if sides.is_empty() {
        warn!("No sides computed from battle report data for {}", url);
        return None;
    }

    if debug_sides {
        log_raw_sides(sides);
    }

    let total_isk: Isk = sides.iter().map(|s| s.totals.isk_lost).sum();
    let total_kills: u32 = sides.iter().map(|s| s.totals.ships_lost).sum();

    let preferred_sides: Vec<&FactionStats> = sides
        .iter()
        .filter(|s| preferred.is_preferred(&s.key))
        .collect();

    let matchup = if preferred_sides.is_empty() {
        neutral_teams(sides, &analysis.graphs)
    } else {
        preferred_teams(sides, &preferred_sides, &analysis.graphs)
    };

    let all_pilots: BTreeSet<CharacterId> = matchup
        .attackers
        .totals
        .pilots
        .union(&matchup.defenders.totals.pilots)
        .copied()
        .collect();

    if debug_sides {
        log_final_teams(&matchup.attackers, &matchup.defenders, &all_pilots);
    }

    Some(BattleReport {
        url: url.to_string(),
        system_name: system_name.to_string(),
        timestamp: timestamp.to_string(),
        total_isk,
        total_kills,
        total_pilots: all_pilots.len(),
        attackers: matchup.attackers.summary(),
        defenders: matchup.defenders.summary(),
        winner: matchup.winner,
        color: matchup.color,
    })
}

/// Teams when the home side is present: home side vs. its main enemy
fn preferred_teams(
    sides: &[FactionStats],
    preferred_sides: &[&FactionStats],
    graphs: &SideGraphs,
) -> Matchup {
    let preferred_keys: Vec<FactionKey> = preferred_sides.iter().map(|s| s.key).collect();

    let mut preferred_team = Team::from_faction(preferred_sides[0]);
    for side in &preferred_sides[1..] {
        preferred_team.merge_from(side);
    }

    let candidates: Vec<&FactionStats> = sides
        .iter()
        .filter(|s| !preferred_keys.contains(&s.key))
        .collect();

    let enemy_team = match find_enemy_seed(&candidates, &preferred_keys, graphs) {
        None => Team::no_opponent(),
        Some(seed) => {
            let mut enemy_team = Team::from_faction(seed);
            let enemy_keys = [seed.key];

            for side in candidates.iter().filter(|s| s.key != seed.key) {
                match alignment(graphs, &side.key, &preferred_keys, &enemy_keys) {
                    Alignment::AgainstFirst => enemy_team.merge_from(side),
                    Alignment::AgainstSecond => preferred_team.merge_from(side),
                    Alignment::ThirdParty => debug!("Leaving {} out of both teams", side.key),
                }
            }
            enemy_team
        }
    };

    let (winner, color) = match preferred_team
        .totals
        .isk_lost
        .partial_cmp(&enemy_team.totals.isk_lost)
    {
        Some(Ordering::Less) => (Outcome::PreferredWin, ReportColor::Green),
        Some(Ordering::Greater) => (Outcome::PreferredLoss, ReportColor::Red),
        _ => (Outcome::Tie, ReportColor::Grey),
    };

    Matchup {
        attackers: preferred_team,
        defenders: enemy_team,
        winner,
        color,
    }
}

/// The enemy side most engaged with the home side.
///
/// Ties go to the earlier candidate. If nobody engaged the home side at all
/// the most involved candidate is taken instead.
fn find_enemy_seed<'a>(
    candidates: &[&'a FactionStats],
    preferred_keys: &[FactionKey],
    graphs: &SideGraphs,
) -> Option<&'a FactionStats> {
    let mut best: Option<(&'a FactionStats, f64)> = None;
    for &side in candidates {
        let engagement = graphs.engagement(&side.key, preferred_keys);
        if best.map_or(true, |(_, top)| engagement > top) {
            best = Some((side, engagement));
        }
    }

    match best {
        Some((side, engagement)) if engagement > 0.0 => Some(side),
        _ => most_involved(candidates.iter().copied()),
    }
}

/// Side with the largest ISK lost + destroyed, earliest wins ties
fn most_involved<'a>(sides: impl Iterator<Item = &'a FactionStats>) -> Option<&'a FactionStats> {
    sides.fold(None, |best, side| match best {
        Some(top) if top.totals.involvement() >= side.totals.involvement() => Some(top),
        _ => Some(side),
    })
}

/// Teams for a battle the home side was not part of
fn neutral_teams(sides: &[FactionStats], graphs: &SideGraphs) -> Matchup {
    let mut ranked: Vec<&FactionStats> = sides.iter().collect();
    ranked.sort_by(|a, b| {
        b.totals
            .involvement()
            .partial_cmp(&a.totals.involvement())
            .unwrap_or(Ordering::Equal)
    });

    let first = ranked[0];
    let second = ranked.get(1).copied();

    let mut team_a = Team::from_faction(first);
    let mut team_b = second.map_or_else(Team::no_opponent, Team::from_faction);

    if let Some(second) = second {
        let first_keys = [first.key];
        let second_keys = [second.key];

        for side in sides.iter().filter(|s| s.key != first.key && s.key != second.key) {
            match alignment(graphs, &side.key, &first_keys, &second_keys) {
                Alignment::AgainstFirst => team_b.merge_from(side),
                Alignment::AgainstSecond => team_a.merge_from(side),
                Alignment::ThirdParty => debug!("Leaving {} out of both teams", side.key),
            }
        }
    }

    // Side with the smaller loss is shown first
    let (attackers, defenders) = if team_a.totals.isk_lost <= team_b.totals.isk_lost {
        (team_a, team_b)
    } else {
        (team_b, team_a)
    };

    let color = if attackers.totals.isk_lost != defenders.totals.isk_lost {
        ReportColor::Green
    } else {
        ReportColor::Grey
    };

    Matchup {
        attackers,
        defenders,
        winner: Outcome::Neutral,
        color,
    }
}

fn log_raw_sides(sides: &[FactionStats]) {
    debug!("=== RAW SIDES ===");
    for s in sides {
        debug!(
            " side_key={:<12} label={:<10} pilots={:>2} isk_lost={:.1} isk_destroyed={:.1}",
            s.key.to_string(),
            s.label,
            s.totals.pilot_count(),
            s.totals.isk_lost,
            s.totals.isk_destroyed
        );
    }
    debug!("=================");
}

fn log_final_teams(attackers: &Team, defenders: &Team, all_pilots: &BTreeSet<CharacterId>) {
    debug!("=== FINAL TEAMS ===");
    debug!(
        " Attackers: {:<10} pilots={:>2} ids={:?}",
        attackers.label,
        attackers.totals.pilot_count(),
        attackers.totals.pilots
    );
    debug!(
        " Defenders: {:<10} pilots={:>2} ids={:?}",
        defenders.label,
        defenders.totals.pilot_count(),
        defenders.totals.pilots
    );
    debug!(" Total unique pilots counted: {}", all_pilots.len());
    debug!("===================");
}
