//! Reqwest-backed `MetricsSource` against the aggregates HTTP API; decodes
//! the wire payloads into domain evolution maps.
use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::model::{Bucket, Evolution, EvolutionMap, Histogram, MetricKind};
use crate::ports::source::{MetricsSource, SourceError};

pub struct AggregatesSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WireChannelVersion {
    channel: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct WireEvolution {
    buckets: Vec<f64>,
    kind: MetricKind,
    description: String,
    #[serde(default)]
    measure: Option<String>,
    data: Vec<WireFrame>,
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    date: String,
    #[serde(default)]
    label: String,
    histogram: Vec<u64>,
}

impl AggregatesSource {
    pub fn new(base_url: String, user_agent: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .pool_idle_timeout(std::time::Duration::from_secs(120))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T, SourceError> {
        debug!(url, "aggregates GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::Status(status.as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MetricsSource for AggregatesSource {
    async fn list_versions(&self) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/aggregates_by/build_id/channels/", self.base_url);
        let entries: Vec<WireChannelVersion> = self.get_json(&url, &[]).await?;
        Ok(entries
            .into_iter()
            .map(|e| format!("{}/{}", e.channel, e.version))
            .collect())
    }

    async fn list_filter_options(
        &self,
        channel: &str,
        version: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, SourceError> {
        let url = format!("{}/filters/", self.base_url);
        let query = [
            ("channel".to_string(), channel.to_string()),
            ("version".to_string(), version.to_string()),
        ];
        self.get_json(&url, &query).await
    }

    async fn fetch_evolution(
        &self,
        channel: &str,
        version: &str,
        metric: &str,
        filters: &BTreeMap<String, String>,
        use_submission_date: bool,
    ) -> Result<EvolutionMap, SourceError> {
        let axis = if use_submission_date {
            "submission_date"
        } else {
            "build_id"
        };
        let url = format!("{}/aggregates_by/{axis}/channels/{channel}/", self.base_url);
        let mut query = vec![
            ("version".to_string(), version.to_string()),
            ("metric".to_string(), metric.to_string()),
        ];
        for (name, value) in filters {
            query.push((name.clone(), value.clone()));
        }
        let wire: WireEvolution = self.get_json(&url, &query).await?;
        Ok(decode_evolution(metric, wire))
    }
}

/// Split the flat frame list into one evolution per key (the wire `label`),
/// rebuilding bucket bounds from consecutive starts.
fn decode_evolution(metric: &str, wire: WireEvolution) -> EvolutionMap {
    let ends = bucket_ends(&wire.buckets);
    let measure = wire.measure.unwrap_or_else(|| metric.to_string());

    let mut frames_by_key: BTreeMap<String, Vec<(NaiveDate, Histogram)>> = BTreeMap::new();
    for frame in wire.data {
        let Ok(date) = NaiveDate::parse_from_str(&frame.date, "%Y%m%d") else {
            warn!(date = %frame.date, "unparseable frame date, skipping");
            continue;
        };
        if frame.histogram.len() != wire.buckets.len() {
            warn!(
                got = frame.histogram.len(),
                want = wire.buckets.len(),
                "frame bucket count mismatch, skipping"
            );
            continue;
        }
        let buckets = wire
            .buckets
            .iter()
            .zip(&ends)
            .zip(&frame.histogram)
            .map(|((&start, &end), &count)| Bucket { start, end, count })
            .collect();
        frames_by_key
            .entry(frame.label)
            .or_default()
            .push((date, Histogram::from_buckets(buckets)));
    }

    frames_by_key
        .into_iter()
        .map(|(key, mut frames)| {
            frames.sort_by_key(|(date, _)| *date);
            (
                key,
                Evolution {
                    kind: wire.kind,
                    description: wire.description.clone(),
                    measure: measure.clone(),
                    frames,
                },
            )
        })
        .collect()
}

/// Each bucket ends where the next begins; the catch-all bucket's end is a
/// guess extrapolated from the last spacing.
fn bucket_ends(starts: &[f64]) -> Vec<f64> {
    let mut ends: Vec<f64> = starts.windows(2).map(|w| w[1]).collect();
    match starts {
        [] => {}
        [only] => ends.push(only + 1.0),
        [.., prev, last] => ends.push(last + (last - prev)),
    }
    ends
}
