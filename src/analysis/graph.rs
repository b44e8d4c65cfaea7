//! Relationship graphs between sides.
//!
//! Each graph maps a side to the sides it is related to and a weight: ISK for
//! kill credit, a killmail count for assists. Absent pairs read as zero.

use std::collections::HashMap;
use std::ops::AddAssign;

use super::types::{FactionKey, Isk};

/// Weighted directed edges `from -> to`
#[derive(Debug, Clone, PartialEq)]
pub struct RelationGraph<V> {
    edges: HashMap<FactionKey, HashMap<FactionKey, V>>,
}

impl<V> Default for RelationGraph<V> {
    fn default() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }
}

impl<V> RelationGraph<V>
where
    V: Copy + Default + AddAssign,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, from: FactionKey, to: FactionKey, amount: V) {
        *self.edges.entry(from).or_default().entry(to).or_default() += amount;
    }

    /// Weight of `from -> to`, zero when the pair was never recorded
    pub fn get(&self, from: &FactionKey, to: &FactionKey) -> V {
        self.edges
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or_default()
    }

    /// All outgoing edges of one side
    pub fn row(&self, from: &FactionKey) -> impl Iterator<Item = (&FactionKey, &V)> {
        self.edges.get(from).into_iter().flat_map(|row| row.iter())
    }

    /// Every recorded `(from, to, weight)` triple
    pub fn pairs(&self) -> impl Iterator<Item = (FactionKey, FactionKey, V)> + '_ {
        self.edges
            .iter()
            .flat_map(|(from, row)| row.iter().map(move |(to, v)| (*from, *to, *v)))
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// The four graphs built while scanning killmails.
///
/// `kills_by` is the transpose of `killers_of` and `assists_by` the transpose
/// of `assists_on`; both halves are only ever written together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideGraphs {
    /// victim -> killer -> ISK credited
    pub killers_of: RelationGraph<Isk>,
    /// killer -> victim -> ISK credited
    pub kills_by: RelationGraph<Isk>,
    /// victim -> attacker -> killmails the attacker appeared on
    pub assists_on: RelationGraph<u32>,
    /// attacker -> victim -> killmails the attacker appeared on
    pub assists_by: RelationGraph<u32>,
}

impl SideGraphs {
    pub fn record_kill(&mut self, victim: FactionKey, killer: FactionKey, value: Isk) {
        self.killers_of.add(victim, killer, value);
        self.kills_by.add(killer, victim, value);
    }

    pub fn record_assist(&mut self, victim: FactionKey, attacker: FactionKey) {
        self.assists_on.add(victim, attacker, 1);
        self.assists_by.add(attacker, victim, 1);
    }

    /// How much `side` fought with any of `targets`.
    ///
    /// Mixes ISK and killmail counts into one number; only useful for
    /// comparing sides against each other and for zero / non-zero tests.
    pub fn engagement(&self, side: &FactionKey, targets: &[FactionKey]) -> f64 {
        targets
            .iter()
            .map(|target| {
                self.killers_of.get(side, target)
                    + self.kills_by.get(side, target)
                    + f64::from(self.assists_on.get(side, target))
                    + f64::from(self.assists_by.get(side, target))
            })
            .sum()
    }
}
