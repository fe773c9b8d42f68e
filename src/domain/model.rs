//! Core metric data model: histograms, per-date evolutions, and the keyed
//! maps the aggregates service hands back for one channel/version/filter set.
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Boolean,
    Flag,
    Enumerated,
    Linear,
    Exponential,
}

impl MetricKind {
    /// Boolean, flag and enumerated metrics index into fixed categories;
    /// linear and exponential carry continuous sample values.
    pub fn is_categorical(self) -> bool {
        matches!(
            self,
            MetricKind::Boolean | MetricKind::Flag | MetricKind::Enumerated
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub start: f64,
    /// Upper bound as reported by the service. For the final bucket this is a
    /// guess; display layers treat it as unbounded instead.
    pub end: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    pub buckets: Vec<Bucket>,
    pub count: u64,
}

impl Histogram {
    pub fn from_buckets(buckets: Vec<Bucket>) -> Self {
        let count = buckets.iter().map(|b| b.count).sum();
        Self { buckets, count }
    }

    pub fn starts(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.start).collect()
    }

    /// Bucket upper bounds with the final (catch-all) bucket forced to +inf.
    pub fn ends_unbounded(&self) -> Vec<f64> {
        let mut ends: Vec<f64> = self.buckets.iter().map(|b| b.end).collect();
        if let Some(last) = ends.last_mut() {
            *last = f64::INFINITY;
        }
        ends
    }

    /// Percentile by linear interpolation inside the containing bucket.
    /// `None` when the histogram holds no samples.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let target = self.count as f64 * p / 100.0;
        let mut seen = 0.0;
        for bucket in &self.buckets {
            let here = bucket.count as f64;
            if seen + here >= target && here > 0.0 {
                let fraction = (target - seen) / here;
                return Some(bucket.start + (bucket.end - bucket.start) * fraction);
            }
            seen += here;
        }
        self.buckets.last().map(|b| b.end)
    }
}

/// One metric's bucketed counts over time for a single
/// channel/version/filter combination.
#[derive(Debug, Clone)]
pub struct Evolution {
    pub kind: MetricKind,
    pub description: String,
    pub measure: String,
    /// Date-ordered frames; all frames share one bucket geometry.
    pub frames: Vec<(NaiveDate, Histogram)>,
}

impl Evolution {
    /// Aggregate of all frames, summed bucket-wise over the first frame's
    /// geometry.
    pub fn histogram(&self) -> Histogram {
        let mut iter = self.frames.iter();
        let Some((_, first)) = iter.next() else {
            return Histogram::default();
        };
        let mut buckets = first.buckets.clone();
        for (_, hist) in iter {
            for (acc, b) in buckets.iter_mut().zip(&hist.buckets) {
                acc.count += b.count;
            }
        }
        Histogram::from_buckets(buckets)
    }

    /// Copy with empty frames dropped; `None` when nothing survives.
    pub fn sanitized(&self) -> Option<Evolution> {
        let frames: Vec<_> = self
            .frames
            .iter()
            .filter(|(_, hist)| hist.count > 0)
            .cloned()
            .collect();
        if frames.is_empty() {
            return None;
        }
        Some(Evolution {
            kind: self.kind,
            description: self.description.clone(),
            measure: self.measure.clone(),
            frames,
        })
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.frames.iter().map(|(date, _)| *date).collect()
    }

    /// Per-frame percentile values, skipping frames without samples.
    pub fn percentiles(&self, p: f64) -> Vec<(NaiveDate, f64)> {
        self.frames
            .iter()
            .filter_map(|(date, hist)| hist.percentile(p).map(|v| (*date, v)))
            .collect()
    }
}

/// Metric key ("" for unkeyed metrics) to evolution. Ordered so a render pass
/// walks keys deterministically.
pub type EvolutionMap = BTreeMap<String, Evolution>;

/// One fetched map plus the compare tag (a filter value or a version string)
/// distinguishing it from its siblings in a multi-series render.
#[derive(Debug, Clone)]
pub struct TaggedEvolutions {
    pub tag: Option<String>,
    pub evolutions: EvolutionMap,
}
