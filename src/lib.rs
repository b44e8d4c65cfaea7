//! # Beacon - Side attribution for WarBeacon battle reports
//!
//! This library turns a WarBeacon battle report (a flat list of killmails)
//! into a two-sided summary: which alliances, corporations and pilots fought
//! together, who the attackers and defenders were, and how much each side
//! lost and destroyed.
//!
//! ## Overview
//!
//! A battle report names many individual sides. Beacon reconstructs two
//! opposing teams from them in two stages:
//!
//! 1. **Killmail analysis**: one pass over the killmails builds per-side
//!    statistics plus kill-credit and assist graphs between sides.
//! 2. **Team building**: the configured home side (or, failing that, the two
//!    most involved sides) anchor two teams; minor sides join a team by who
//!    they fought, or stay out as third parties.
//!
//! ## Architecture
//!
//! - `analysis`: side statistics, relationship graphs, team building, output
//! - `payload`: WarBeacon response envelope and source labels
//! - `parsers`: time and id coercion helpers
//! - `config`: preferred sides and cache settings (YAML + environment)
//! - `cache`: bounded, expiring report cache
//! - `service`: the payload -> report pipeline
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use beacon::config::Config;
//! use beacon::payload::ReportSource;
//! use beacon::service::ReportService;
//!
//! let raw = std::fs::read_to_string("br.json")?;
//! let source = ReportSource::parse_related("30000142:202512030400")?;
//!
//! let mut service = ReportService::new(Config::from_env());
//! if let Some(report) = service.report_for("https://warbeacon.net/br/related/30000142/202512030400/", &source, &raw)? {
//!     println!("{} vs {}", report.attackers.label_with_count, report.defenders.label_with_count);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Report building never fails on odd data: bad values degrade to zero or are
//! skipped, and an empty battle yields `None`. Typed errors (`PayloadError`,
//! `ConfigError`) cover malformed input, and file-facing functions return
//! `color_eyre` results with context.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod parsers;
pub mod payload;
pub mod service;
