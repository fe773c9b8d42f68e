//! Chart parameter normalization: fills defaults, resolves the anchor
//! version, and strips option combinations that cannot be honoured together.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CHANNEL: &str = "nightly";
pub const DEFAULT_METRIC: &str = "GC_MS";
pub const DEFAULT_KEY_LIMIT: usize = 4;

/// Filters may arrive either as an already-structured mapping or as a JSON
/// string lifted straight out of a URL query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    Text(String),
    Map(BTreeMap<String, String>),
}

/// Raw, possibly partial parameters as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartParams {
    pub channel: Option<String>,
    pub version: Option<String>,
    pub metric: Option<String>,
    pub filters: Option<FilterSpec>,
    pub use_submission_date: Option<bool>,
    pub sanitize: Option<bool>,
    pub trim: Option<bool>,
    pub log_y: Option<bool>,
    pub compare: Option<String>,
    pub sensible_compare: Option<bool>,
    pub key_limit: Option<i64>,
    pub evo_versions: Option<u32>,
}

/// Fully-resolved parameters; everything downstream of normalization works
/// off this.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParams {
    pub channel: String,
    pub version: String,
    pub metric: String,
    pub filters: BTreeMap<String, String>,
    pub use_submission_date: bool,
    pub sanitize: bool,
    pub trim: bool,
    pub log_y: bool,
    pub compare: Option<String>,
    pub sensible_compare: bool,
    pub key_limit: usize,
    pub evo_versions: u32,
}

/// Release-train distance from nightly, used when no version is requested.
fn versions_off_nightly(channel: &str) -> i64 {
    match channel {
        "nightly" => 0,
        "aurora" => 1,
        "beta" => 2,
        "release" => 3,
        _ => 0,
    }
}

/// Highest nightly version number present in a "channel/version" list.
fn latest_nightly(version_list: &[String]) -> Option<i64> {
    version_list
        .iter()
        .filter_map(|v| v.strip_prefix("nightly/"))
        .filter_map(|v| v.parse::<i64>().ok())
        .max()
}

impl ChartParams {
    /// Normalize into a [`ResolvedParams`]. `version_list` is consulted only
    /// when no explicit version was given; pass whatever `list_versions`
    /// returned (an empty slice is acceptable when a version is present).
    pub fn resolve(mut self, version_list: &[String]) -> ResolvedParams {
        let evo_versions = self.evo_versions.unwrap_or(0);
        if evo_versions > 0 {
            // Evolution-over-versions cannot be combined with trimming or
            // comparison multiplexing.
            self.trim = None;
            self.compare = None;
            self.sensible_compare = None;
        }

        let channel = self
            .channel
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

        let version = match self.version {
            Some(v) => v,
            None => match latest_nightly(version_list) {
                Some(latest) => (latest - versions_off_nightly(&channel)).to_string(),
                None => {
                    warn!(%channel, "no nightly versions available to default from");
                    String::new()
                }
            },
        };

        let filters = match self.filters {
            Some(FilterSpec::Map(map)) => map,
            Some(FilterSpec::Text(text)) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(error) => {
                    warn!(%error, "filters failed to parse as JSON, ignoring filters");
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };

        // Comparing over a dimension the filters already pin is meaningless.
        let compare = match self.compare {
            Some(dimension) if filters.contains_key(&dimension) => None,
            other => other,
        };

        let key_limit = match self.key_limit {
            Some(n) if n > 0 => n as usize,
            _ => DEFAULT_KEY_LIMIT,
        };

        ResolvedParams {
            channel,
            version,
            metric: self.metric.unwrap_or_else(|| DEFAULT_METRIC.to_string()),
            filters,
            use_submission_date: self.use_submission_date.unwrap_or(false),
            sanitize: self.sanitize.unwrap_or(true),
            trim: if evo_versions > 0 {
                false
            } else {
                self.trim.unwrap_or(true)
            },
            log_y: self.log_y.unwrap_or(false),
            compare,
            sensible_compare: if evo_versions > 0 {
                false
            } else {
                self.sensible_compare.unwrap_or(true)
            },
            key_limit,
            evo_versions,
        }
    }
}

impl ResolvedParams {
    /// Version numbers available on this channel, numerically sorted.
    pub fn channel_versions(&self, version_list: &[String]) -> Vec<i64> {
        let prefix = format!("{}/", self.channel);
        let mut numbers: Vec<i64> = version_list
            .iter()
            .filter_map(|v| v.strip_prefix(&prefix))
            .filter_map(|v| v.parse::<i64>().ok())
            .collect();
        numbers.sort_unstable();
        numbers
    }

    /// The window of up to `evo_versions` consecutive versions ending at (and
    /// including) the anchor version. Empty when the anchor is not present on
    /// the channel.
    pub fn evolution_window(&self, version_list: &[String]) -> Vec<String> {
        let numbers = self.channel_versions(version_list);
        let Some(anchor) = numbers.iter().position(|n| n.to_string() == self.version) else {
            return Vec::new();
        };
        let lo = (anchor + 1).saturating_sub(self.evo_versions as usize);
        numbers[lo..=anchor].iter().map(|n| n.to_string()).collect()
    }
}
