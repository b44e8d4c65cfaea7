//! Core data types for battle report side analysis.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::graph::SideGraphs;
use crate::parsers::{coerce_character_id, coerce_entity_id};

/// ISK amounts are carried as floating point throughout
pub type Isk = f64;

/// EVE character id
pub type CharacterId = i64;

/// Identity of a side: the alliance, corporation or lone character an entity
/// fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FactionKey {
    Alliance(i64),
    Corporation(i64),
    Character(i64),
    /// Entity carried none of the identifying ids
    Unknown,
}

impl FactionKey {
    /// Resolve the side an entity belongs to.
    ///
    /// Alliance wins over corporation, corporation over character. An id that
    /// cannot be coerced to an integer does not identify a side, so the next
    /// one in that order is tried.
    pub fn for_entity(entity: &Entity) -> Self {
        if let Some(alliance_id) = entity.alliance_id() {
            return FactionKey::Alliance(alliance_id);
        }
        if let Some(corporation_id) = entity.corporation_id() {
            return FactionKey::Corporation(corporation_id);
        }
        match entity.character_id() {
            Some(character_id) => FactionKey::Character(character_id),
            None => FactionKey::Unknown,
        }
    }

    /// Numeric id behind the key, if any
    pub fn id(&self) -> Option<i64> {
        match *self {
            FactionKey::Alliance(id) | FactionKey::Corporation(id) | FactionKey::Character(id) => {
                Some(id)
            }
            FactionKey::Unknown => None,
        }
    }
}

impl fmt::Display for FactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactionKey::Alliance(id) => write!(f, "a:{}", id),
            FactionKey::Corporation(id) => write!(f, "c:{}", id),
            FactionKey::Character(id) => write!(f, "p:{}", id),
            FactionKey::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for FactionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Treat an explicit JSON `null` the same as a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A victim or attacker as it appears on a killmail.
///
/// The loosely typed fields are kept as raw JSON so that odd values from the
/// API degrade to "absent" instead of failing the whole report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub alliance_id: Option<Value>,
    pub corporation_id: Option<Value>,
    pub character_id: Option<Value>,
    pub damage_done: Option<Value>,
    pub final_blow: Option<Value>,
}

impl Entity {
    pub fn alliance_id(&self) -> Option<i64> {
        self.alliance_id.as_ref().and_then(coerce_entity_id)
    }

    pub fn corporation_id(&self) -> Option<i64> {
        self.corporation_id.as_ref().and_then(coerce_entity_id)
    }

    pub fn character_id(&self) -> Option<CharacterId> {
        self.character_id.as_ref().and_then(coerce_character_id)
    }

    /// Damage contribution, only when the API sent an actual number
    pub fn damage(&self) -> Option<f64> {
        match self.damage_done {
            Some(Value::Number(ref n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn has_final_blow(&self) -> bool {
        match self.final_blow {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(ref n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(ref s)) => !s.is_empty(),
            _ => false,
        }
    }
}

/// One kill event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Killmail {
    pub total_value: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub victim: Entity,
    #[serde(deserialize_with = "null_as_default")]
    pub attackers: Vec<Entity>,
}

impl Killmail {
    /// ISK value of the kill; numeric strings are accepted, anything else is 0
    pub fn value(&self) -> Isk {
        match self.total_value {
            Some(Value::Number(ref n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(ref s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Display names keyed by stringified numeric id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameTable {
    #[serde(deserialize_with = "null_as_default")]
    pub entities: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tickers: HashMap<String, String>,
}

impl NameTable {
    /// Human readable label for a side: ticker, then full name, then `ID <n>`
    pub fn label_for(&self, key: &FactionKey) -> String {
        let Some(id) = key.id() else {
            return "Unknown".to_string();
        };
        let str_id = id.to_string();

        if let Some(ticker) = self.tickers.get(&str_id).filter(|t| !t.is_empty()) {
            return ticker.clone();
        }
        if let Some(name) = self.entities.get(&str_id).filter(|n| !n.is_empty()) {
            return name.clone();
        }
        format!("ID {}", id)
    }
}

/// Additive losses/kills/pilots shared by single sides and merged teams
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideTotals {
    pub isk_lost: Isk,
    pub ships_lost: u32,
    pub isk_destroyed: Isk,
    pub ships_destroyed: u32,
    pub pilots: BTreeSet<CharacterId>,
}

impl SideTotals {
    /// Field-wise sum with another set of totals; pilots are unioned
    pub fn absorb(&mut self, other: &SideTotals) {
        self.isk_lost += other.isk_lost;
        self.ships_lost += other.ships_lost;
        self.isk_destroyed += other.isk_destroyed;
        self.ships_destroyed += other.ships_destroyed;
        self.pilots.extend(other.pilots.iter().copied());
    }

    /// ISK lost plus ISK destroyed
    pub fn involvement(&self) -> Isk {
        self.isk_lost + self.isk_destroyed
    }

    pub fn pilot_count(&self) -> usize {
        self.pilots.len()
    }
}

/// Statistics for a single side (alliance/corp/character) in a battle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactionStats {
    pub key: FactionKey,
    pub label: String,
    #[serde(flatten)]
    pub totals: SideTotals,
}

impl FactionStats {
    pub fn new(key: FactionKey, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
            totals: SideTotals::default(),
        }
    }

    pub fn record_loss(&mut self, value: Isk) {
        self.totals.isk_lost += value;
        self.totals.ships_lost += 1;
    }

    pub fn record_kill(&mut self, value: Isk) {
        self.totals.isk_destroyed += value;
        self.totals.ships_destroyed += 1;
    }

    pub fn add_pilot(&mut self, character_id: Option<CharacterId>) {
        if let Some(id) = character_id {
            self.totals.pilots.insert(id);
        }
    }

    pub fn merge_from(&mut self, other: &FactionStats) {
        self.totals.absorb(&other.totals);
    }
}

/// One or more sides fighting together
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    /// Key of the side the team was seeded from; `None` for the "No Opponent" placeholder
    pub seed: Option<FactionKey>,
    pub label: String,
    pub totals: SideTotals,
}

impl Team {
    pub fn from_faction(side: &FactionStats) -> Self {
        Self {
            seed: Some(side.key),
            label: side.label.clone(),
            totals: side.totals.clone(),
        }
    }

    pub fn no_opponent() -> Self {
        Self {
            seed: None,
            label: "No Opponent".to_string(),
            totals: SideTotals::default(),
        }
    }

    pub fn merge_from(&mut self, side: &FactionStats) {
        self.totals.absorb(&side.totals);
    }

    /// Label with pilot count, e.g. `INIT (15)`
    pub fn label_with_count(&self) -> String {
        format!("{} ({})", self.label, self.totals.pilot_count())
    }

    pub fn summary(&self) -> TeamSummary {
        TeamSummary {
            name: self.label.clone(),
            label_with_count: self.label_with_count(),
            pilot_count: self.totals.pilot_count(),
            isk_lost: self.totals.isk_lost,
            ships_lost: self.totals.ships_lost,
            isk_destroyed: self.totals.isk_destroyed,
            ships_destroyed: self.totals.ships_destroyed,
        }
    }
}

/// Display-ready numbers for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub name: String,
    pub label_with_count: String,
    pub pilot_count: usize,
    pub isk_lost: Isk,
    pub ships_lost: u32,
    pub isk_destroyed: Isk,
    pub ships_destroyed: u32,
}

/// Who came out ahead, from the configured home side's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    PreferredWin,
    PreferredLoss,
    Tie,
    /// No preferred side took part
    Neutral,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::PreferredWin => write!(f, "preferred_win"),
            Outcome::PreferredLoss => write!(f, "preferred_loss"),
            Outcome::Tie => write!(f, "tie"),
            Outcome::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportColor {
    Green,
    Red,
    Grey,
}

impl fmt::Display for ReportColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportColor::Green => write!(f, "green"),
            ReportColor::Red => write!(f, "red"),
            ReportColor::Grey => write!(f, "grey"),
        }
    }
}

/// A processed battle report ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub url: String,
    pub system_name: String,
    pub timestamp: String,
    pub total_isk: Isk,
    pub total_kills: u32,
    pub total_pilots: usize,
    pub attackers: TeamSummary,
    pub defenders: TeamSummary,
    pub winner: Outcome,
    pub color: ReportColor,
}

/// Result of the single pass over a battle's killmails
#[derive(Debug, Clone, Default)]
pub struct SideAnalysis {
    /// Every side seen, sorted by (ISK lost, ISK destroyed) descending
    pub sides: Vec<FactionStats>,
    pub graphs: SideGraphs,
}

impl SideAnalysis {
    pub fn side(&self, key: &FactionKey) -> Option<&FactionStats> {
        self.sides.iter().find(|s| &s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_key_prefers_alliance() {
        let e = entity(json!({"alliance_id": 12345, "corporation_id": 67890, "character_id": 11111}));
        assert_eq!(FactionKey::for_entity(&e), FactionKey::Alliance(12345));
        assert_eq!(FactionKey::for_entity(&e).to_string(), "a:12345");
    }

    #[test]
    fn test_key_fallbacks() {
        let corp = entity(json!({"corporation_id": 67890, "character_id": 11111}));
        assert_eq!(FactionKey::for_entity(&corp).to_string(), "c:67890");

        let pilot = entity(json!({"character_id": 11111}));
        assert_eq!(FactionKey::for_entity(&pilot).to_string(), "p:11111");

        assert_eq!(FactionKey::for_entity(&Entity::default()), FactionKey::Unknown);
        assert_eq!(FactionKey::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_key_zero_and_null_ids() {
        let zero = entity(json!({"alliance_id": 0}));
        assert_eq!(FactionKey::for_entity(&zero), FactionKey::Alliance(0));

        let null_alliance = entity(json!({"alliance_id": null, "corporation_id": 12345}));
        assert_eq!(FactionKey::for_entity(&null_alliance), FactionKey::Corporation(12345));
    }

    #[test]
    fn test_key_from_loose_ids() {
        let string_alliance = entity(json!({"alliance_id": "3", "corporation_id": 4}));
        assert_eq!(FactionKey::for_entity(&string_alliance), FactionKey::Alliance(3));

        let float_corp = entity(json!({"corporation_id": 98648442.0}));
        assert_eq!(FactionKey::for_entity(&float_corp), FactionKey::Corporation(98648442));

        // Unusable ids fall through to the next one
        let bad_alliance = entity(json!({"alliance_id": "none", "corporation_id": "77"}));
        assert_eq!(FactionKey::for_entity(&bad_alliance), FactionKey::Corporation(77));

        let bad_both = entity(json!({"alliance_id": {}, "corporation_id": 1.5, "character_id": 9}));
        assert_eq!(FactionKey::for_entity(&bad_both), FactionKey::Character(9));
    }

    #[test]
    fn test_entity_loose_fields() {
        let e = entity(json!({"character_id": "42", "damage_done": "lots", "final_blow": 1}));
        assert_eq!(e.character_id(), Some(42));
        assert_eq!(e.damage(), None);
        assert!(e.has_final_blow());

        let e = entity(json!({"character_id": [1], "damage_done": 250, "final_blow": null}));
        assert_eq!(e.character_id(), None);
        assert_eq!(e.damage(), Some(250.0));
        assert!(!e.has_final_blow());
    }

    #[test]
    fn test_killmail_value_coercion() {
        let km: Killmail = serde_json::from_value(json!({"total_value": 1500.5})).unwrap();
        assert_eq!(km.value(), 1500.5);

        let km: Killmail = serde_json::from_value(json!({"total_value": "2000"})).unwrap();
        assert_eq!(km.value(), 2000.0);

        let km: Killmail = serde_json::from_value(json!({"total_value": "n/a"})).unwrap();
        assert_eq!(km.value(), 0.0);

        let km: Killmail = serde_json::from_value(json!({"victim": null, "attackers": null})).unwrap();
        assert_eq!(km.value(), 0.0);
        assert!(km.attackers.is_empty());
    }

    #[test]
    fn test_label_resolution() {
        let names = NameTable {
            entities: HashMap::from([
                ("100".to_string(), "Victim Alliance".to_string()),
                ("200".to_string(), "Attacker Alliance".to_string()),
            ]),
            tickers: HashMap::from([("100".to_string(), "VICT".to_string())]),
        };

        assert_eq!(names.label_for(&FactionKey::Alliance(100)), "VICT");
        assert_eq!(names.label_for(&FactionKey::Alliance(200)), "Attacker Alliance");
        assert_eq!(names.label_for(&FactionKey::Corporation(300)), "ID 300");
        assert_eq!(names.label_for(&FactionKey::Unknown), "Unknown");
    }

    #[test]
    fn test_pilot_roster_is_a_set() {
        let mut side = FactionStats::new(FactionKey::Alliance(1), "A");
        side.add_pilot(Some(7));
        side.add_pilot(Some(7));
        side.add_pilot(None);
        assert_eq!(side.totals.pilot_count(), 1);
    }

    #[test]
    fn test_merge_is_commutative_and_unions_pilots() {
        let mut a = FactionStats::new(FactionKey::Alliance(1), "A");
        a.record_loss(100.0);
        a.record_kill(50.0);
        a.add_pilot(Some(1));
        a.add_pilot(Some(2));

        let mut b = FactionStats::new(FactionKey::Alliance(2), "B");
        b.record_loss(30.0);
        b.add_pilot(Some(2));
        b.add_pilot(Some(3));

        let mut ab = a.clone();
        ab.merge_from(&b);
        let mut ba = b.clone();
        ba.merge_from(&a);

        assert_eq!(ab.totals, ba.totals);
        assert_eq!(ab.totals.isk_lost, 130.0);
        assert_eq!(ab.totals.ships_lost, 2);
        assert_eq!(ab.totals.isk_destroyed, 50.0);
        assert_eq!(ab.totals.pilot_count(), 3);
    }

    #[test]
    fn test_team_summary() {
        let mut side = FactionStats::new(FactionKey::Alliance(1), "INIT");
        side.add_pilot(Some(1));
        side.add_pilot(Some(2));
        let team = Team::from_faction(&side);
        assert_eq!(team.label_with_count(), "INIT (2)");
        assert_eq!(team.summary().pilot_count, 2);

        let empty = Team::no_opponent();
        assert_eq!(empty.seed, None);
        assert_eq!(empty.label_with_count(), "No Opponent (0)");
    }

    #[test]
    fn test_tags_serialize() {
        assert_eq!(serde_json::to_string(&Outcome::PreferredWin).unwrap(), "\"preferred_win\"");
        assert_eq!(serde_json::to_string(&ReportColor::Grey).unwrap(), "\"grey\"");
        assert_eq!(serde_json::to_string(&FactionKey::Corporation(5)).unwrap(), "\"c:5\"");
    }
}
