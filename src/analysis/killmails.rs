//! Killmail analysis.
//!
//! Single pass over a battle's killmails that builds per-side statistics and
//! the kill / assist graphs between sides.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::graph::SideGraphs;
use super::types::*;

/// What one side contributed to a single killmail
#[derive(Debug, Clone, PartialEq)]
pub struct AttackerTally {
    pub key: FactionKey,
    pub count: u32,
    pub damage: f64,
    pub final_blow: bool,
}

impl AttackerTally {
    fn new(key: FactionKey) -> Self {
        Self {
            key,
            count: 0,
            damage: 0.0,
            final_blow: false,
        }
    }
}

/// Sides in first-seen order, created on first reference
struct SideLedger<'a> {
    names: &'a NameTable,
    sides: Vec<FactionStats>,
    index: HashMap<FactionKey, usize>,
}

impl<'a> SideLedger<'a> {
    fn new(names: &'a NameTable) -> Self {
        Self {
            names,
            sides: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn ensure(&mut self, key: FactionKey) -> &mut FactionStats {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.sides.push(FactionStats::new(key, self.names.label_for(&key)));
                self.index.insert(key, self.sides.len() - 1);
                self.sides.len() - 1
            }
        };
        &mut self.sides[idx]
    }

    /// Sort by (ISK lost, ISK destroyed) descending. The sort is stable, so
    /// fully tied sides stay in first-seen order.
    fn into_sorted(self) -> Vec<FactionStats> {
        let mut sides = self.sides;
        sides.sort_by(|a, b| {
            b.totals
                .isk_lost
                .partial_cmp(&a.totals.isk_lost)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.totals
                        .isk_destroyed
                        .partial_cmp(&a.totals.isk_destroyed)
                        .unwrap_or(Ordering::Equal)
                })
        });
        sides
    }
}

/// Analyze killmails to determine sides and their relationships.
///
/// For every killmail the victim's side is charged with the loss, every
/// attacking side is recorded as assisting (once per killmail), and one
/// attacking side is credited with the kill (see [`determine_killer`]).
pub fn analyze_killmails(killmails: &[Killmail], names: &NameTable) -> SideAnalysis {
    let mut ledger = SideLedger::new(names);
    let mut graphs = SideGraphs::default();

    for km in killmails {
        let value = km.value();

        let victim_key = FactionKey::for_entity(&km.victim);
        let victim = ledger.ensure(victim_key);
        victim.record_loss(value);
        victim.add_pilot(km.victim.character_id());

        if km.attackers.is_empty() {
            continue;
        }

        let tallies = tally_attackers(&km.attackers, &mut ledger);

        for tally in &tallies {
            if tally.key != victim_key {
                graphs.record_assist(victim_key, tally.key);
            }
        }

        if let Some(killer_key) = determine_killer(&tallies) {
            ledger.ensure(killer_key).record_kill(value);
            graphs.record_kill(victim_key, killer_key, value);
        }
    }

    let sides = ledger.into_sorted();
    log::debug!("Analyzed {} killmails across {} sides", killmails.len(), sides.len());

    SideAnalysis { sides, graphs }
}

/// Group one killmail's attackers by side, in order of first appearance
fn tally_attackers(attackers: &[Entity], ledger: &mut SideLedger<'_>) -> Vec<AttackerTally> {
    let mut tallies: Vec<AttackerTally> = Vec::new();

    for attacker in attackers {
        let key = FactionKey::for_entity(attacker);
        ledger.ensure(key).add_pilot(attacker.character_id());

        let idx = match tallies.iter().position(|t| t.key == key) {
            Some(idx) => idx,
            None => {
                tallies.push(AttackerTally::new(key));
                tallies.len() - 1
            }
        };
        let tally = &mut tallies[idx];

        tally.count += 1;
        if let Some(damage) = attacker.damage() {
            tally.damage += damage;
        }
        if attacker.has_final_blow() {
            tally.final_blow = true;
        }
    }

    tallies
}

/// Decide which side gets credit for a kill.
///
/// Precedence: a side holding the final blow, then the side with the most
/// damage (only when some damage was dealt), then the side with the most
/// attackers. Ties at every step go to the side that appeared first on the
/// attacker list.
pub fn determine_killer(tallies: &[AttackerTally]) -> Option<FactionKey> {
    if let Some(tally) = tallies.iter().find(|t| t.final_blow) {
        return Some(tally.key);
    }

    let max_damage = tallies.iter().map(|t| t.damage).fold(0.0, f64::max);
    if max_damage > 0.0 {
        return tallies.iter().find(|t| t.damage == max_damage).map(|t| t.key);
    }

    let max_count = tallies.iter().map(|t| t.count).max()?;
    tallies.iter().find(|t| t.count == max_count).map(|t| t.key)
}
