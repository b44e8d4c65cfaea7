//! Report building pipeline: payload -> side analysis -> teams -> cache.

use log::{debug, info};

use crate::analysis::{analyze_killmails, build_battle_report, BattleReport};
use crate::cache::ReportCache;
use crate::config::Config;
use crate::payload::{parse_response, PayloadError, ReportSource};

/// Build a report from a raw API response without touching any cache.
///
/// `Ok(None)` means the payload was valid but held nothing to report.
pub fn build_report(
    url: &str,
    source: &ReportSource,
    raw: &str,
    config: &Config,
) -> Result<Option<BattleReport>, PayloadError> {
    let data = parse_response(raw)?;
    let system_name = source.location_label(&data);
    let timestamp = source.timestamp_label();

    let analysis = analyze_killmails(&data.killmails, &data.names);
    Ok(build_battle_report(
        url,
        &system_name,
        &timestamp,
        &analysis,
        &config.preferred,
        config.debug_sides,
    ))
}

/// Builds reports for one configuration, remembering finished ones
pub struct ReportService {
    config: Config,
    cache: ReportCache,
}

impl ReportService {
    pub fn new(config: Config) -> Self {
        let cache = ReportCache::from_config(&config.cache);
        Self { config, cache }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Report previously built for `url`, if still fresh
    pub fn cached(&mut self, url: &str) -> Option<BattleReport> {
        self.cache.get(url).cloned()
    }

    /// Store a report built elsewhere (e.g. on a worker thread)
    pub fn remember(&mut self, report: BattleReport) {
        self.cache.insert(report.url.clone(), report);
    }

    /// Cached report for `url`, or build one from `raw` and cache it
    pub fn report_for(
        &mut self,
        url: &str,
        source: &ReportSource,
        raw: &str,
    ) -> Result<Option<BattleReport>, PayloadError> {
        if let Some(report) = self.cached(url) {
            debug!("Using cached report for {}", url);
            return Ok(Some(report));
        }

        let report = build_report(url, source, raw, &self.config)?;
        match report {
            Some(ref report) => {
                info!(
                    "Built report for {}: {} vs {} ({})",
                    url, report.attackers.label_with_count, report.defenders.label_with_count, report.winner
                );
                self.remember(report.clone());
            }
            None => info!("Nothing to report for {}", url),
        }
        Ok(report)
    }
}
