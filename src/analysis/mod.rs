//! Battle report side analysis.
//!
//! This module turns a flat list of killmails into per-faction statistics,
//! relationship graphs between factions, and finally a two-team report.

pub mod types;
pub mod graph;
pub mod killmails;
pub mod teams;
pub mod report;

pub use types::*;
pub use graph::{RelationGraph, SideGraphs};
pub use killmails::analyze_killmails;
pub use teams::build_battle_report;
pub use report::{generate_json_report, print_summary};
