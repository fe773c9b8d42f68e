//! Chart model produced by a render pass, and the per-key selection of how a
//! comparison set should be drawn. Rendering proper (SVG, canvas, terminal)
//! is a consumer concern; this layer only decides shape and values.
use chrono::NaiveDate;
use tracing::warn;

use crate::domain::model::{Histogram, MetricKind};
use crate::domain::params::ResolvedParams;
use crate::domain::regroup::{shared_trims, GroupMember, KeyGroup};

/// Slice labels for boolean/flag pies; buckets past these fall back to their
/// start value.
const PIE_BUCKET_NAMES: [&str; 3] = ["False", "True", "Invalid"];
/// Categorical time series plot the share of this bucket over time.
const BUCKET_INDEX_FOR_ENUMERATED: usize = 0;

/// Everything appended to a mount element during one render pass.
#[derive(Debug, Default)]
pub struct Mount {
    pub blocks: Vec<Block>,
}

impl Mount {
    pub fn push_chart(&mut self, block: ChartBlock) {
        self.blocks.push(Block::Chart(block));
    }

    pub fn push_error(&mut self, message: impl Into<String>, params_echo: String) {
        self.blocks.push(Block::Error(ErrorBlock {
            message: message.into(),
            params_echo,
        }));
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Chart(c) => Some(c),
            Block::Error(_) => None,
        })
    }
}

#[derive(Debug)]
pub enum Block {
    Chart(ChartBlock),
    Error(ErrorBlock),
}

/// Inline message shown instead of a chart, echoing the parameters that led
/// there.
#[derive(Debug)]
pub struct ErrorBlock {
    pub message: String,
    pub params_echo: String,
}

/// One self-contained chart: title, subtitle, legend, and the data to draw.
#[derive(Debug)]
pub struct ChartBlock {
    pub title: String,
    pub subtitle: String,
    pub legend: Vec<String>,
    pub data: ChartData,
}

/// The shape a key's comparison set gets drawn as, decided once from series
/// count, metric kind, and mode flags.
#[derive(Debug)]
pub enum ChartData {
    /// Proportion pie for a lone boolean/flag histogram.
    Pie { slices: Vec<PieSlice> },
    /// Percent-of-samples per bucket for a lone series of any other kind.
    Histogram {
        axis: BucketAxis,
        values: Vec<f64>,
        x_label: String,
        log_y: bool,
    },
    /// Overlaid percent-of-samples lines, one per compare tag.
    MultiLine {
        axis: BucketAxis,
        series: Vec<LineSeries>,
        x_label: String,
        log_y: bool,
    },
    /// Per-date values across an evolution window, one line per tag.
    TimeSeries {
        lines: Vec<TimeLine>,
        x_label: String,
        y_label: String,
        values_are_percent: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug)]
pub struct LineSeries {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug)]
pub struct TimeLine {
    pub label: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Shared bucket boundaries for histogram-shaped charts. The final end is
/// always +inf; the service's guess for the catch-all bucket is not trusted.
#[derive(Debug, Clone)]
pub struct BucketAxis {
    pub starts: Vec<f64>,
    pub ends: Vec<f64>,
    pub enumerated: bool,
}

impl BucketAxis {
    /// Human label for one bucket, matching how the hover legend describes
    /// ranges.
    pub fn label(&self, index: usize) -> String {
        let start = self.starts[index];
        let end = self.ends[index];
        if end == f64::INFINITY {
            format!("\u{2265} {}", format_number(start))
        } else if self.enumerated {
            format_number(start)
        } else {
            format!("[{}, {})", format_number(start), format_number(end))
        }
    }

    fn trimmed(&self, left: usize, right: usize) -> BucketAxis {
        BucketAxis {
            starts: self.starts[left..self.starts.len() - right].to_vec(),
            ends: self.ends[left..self.ends.len() - right].to_vec(),
            enumerated: self.enumerated,
        }
    }
}

/// Build the chart block for one key's comparison set, or `None` when nothing
/// in the set survives sanitization.
pub fn build_key_chart(params: &ResolvedParams, group: KeyGroup) -> Option<ChartBlock> {
    let mut members = group.members;
    if params.sanitize {
        // Dropping a dead series drops its compare tag with it, keeping the
        // legend aligned.
        members = members
            .into_iter()
            .filter_map(|mut m| {
                m.evolution = m.evolution.sanitized()?;
                Some(m)
            })
            .collect();
    }
    let Some(first) = members.first() else {
        warn!(key = %group.key, "no histogram for key");
        return None;
    };

    let title = first.evolution.measure.clone();
    let subtitle = subtitle_for(params, &group.key);
    let kind = first.evolution.kind;
    let description = first.evolution.description.clone();

    if params.evo_versions > 0 {
        let (data, legend) = time_series(params, &members, kind, &description);
        return Some(ChartBlock {
            title,
            subtitle,
            legend,
            data,
        });
    }

    let hists: Vec<Histogram> = members.iter().map(|m| m.evolution.histogram()).collect();
    // Bucket geometry is shared across the comparison set; the first series
    // speaks for all of them.
    let axis = BucketAxis {
        starts: hists[0].starts(),
        ends: hists[0].ends_unbounded(),
        enumerated: kind == MetricKind::Enumerated,
    };

    // A lone boolean/flag histogram reads best as a pie, and is never
    // trimmed or log-scaled.
    if members.len() == 1 && matches!(kind, MetricKind::Boolean | MetricKind::Flag) {
        return Some(ChartBlock {
            title,
            subtitle,
            legend: Vec::new(),
            data: pie(&hists[0], &axis),
        });
    }

    let mut values: Vec<Vec<f64>> = hists
        .iter()
        .map(|h| percent_values(h, params.log_y))
        .collect();

    let mut axis = axis;
    if params.trim {
        let evolutions: Vec<_> = members.iter().map(|m| &m.evolution).collect();
        let (left, right) = shared_trims(&evolutions);
        if left + right > 0 {
            for series in &mut values {
                *series = series[left..series.len() - right].to_vec();
            }
            axis = axis.trimmed(left, right);
        }
    }

    if values.len() == 1 {
        Some(ChartBlock {
            title,
            subtitle,
            legend: Vec::new(),
            data: ChartData::Histogram {
                axis,
                values: values.pop().unwrap_or_default(),
                x_label: description,
                log_y: params.log_y,
            },
        })
    } else {
        let compare_dim = params.compare.as_deref().unwrap_or("");
        let legend: Vec<String> = members
            .iter()
            .map(|m| format!("{}={}", compare_dim, m.tag.as_deref().unwrap_or("")))
            .collect();
        let series = legend
            .iter()
            .zip(values)
            .map(|(label, values)| LineSeries {
                label: label.clone(),
                values,
            })
            .collect();
        Some(ChartBlock {
            title,
            subtitle,
            legend,
            data: ChartData::MultiLine {
                axis,
                series,
                x_label: description,
                log_y: params.log_y,
            },
        })
    }
}

fn time_series(
    params: &ResolvedParams,
    members: &[GroupMember],
    kind: MetricKind,
    description: &str,
) -> (ChartData, Vec<String>) {
    let legend: Vec<String> = members
        .iter()
        .map(|m| m.tag.clone().unwrap_or_default())
        .collect();
    let (y_label, values_are_percent, lines) = if kind.is_categorical() {
        let y_label = if kind == MetricKind::Boolean {
            format!("{description} % FALSE")
        } else {
            format!("{description} - bucket {BUCKET_INDEX_FOR_ENUMERATED}")
        };
        let lines = members
            .iter()
            .zip(&legend)
            .map(|(m, label)| TimeLine {
                label: label.clone(),
                points: m
                    .evolution
                    .frames
                    .iter()
                    .filter(|(_, h)| h.count > 0)
                    .map(|(date, h)| {
                        let count = h
                            .buckets
                            .get(BUCKET_INDEX_FOR_ENUMERATED)
                            .map_or(0, |b| b.count);
                        (*date, 100.0 * count as f64 / h.count as f64)
                    })
                    .collect(),
            })
            .collect();
        (y_label, true, lines)
    } else {
        let lines = members
            .iter()
            .zip(&legend)
            .map(|(m, label)| TimeLine {
                label: label.clone(),
                points: m.evolution.percentiles(50.0),
            })
            .collect();
        (format!("{description} - medians"), false, lines)
    };
    let x_label = if params.use_submission_date {
        "Submission Date"
    } else {
        "Built Date"
    };
    (
        ChartData::TimeSeries {
            lines,
            x_label: x_label.to_string(),
            y_label,
            values_are_percent,
        },
        legend,
    )
}

fn pie(hist: &Histogram, axis: &BucketAxis) -> ChartData {
    let total = hist.count as f64;
    let slices = hist
        .buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| PieSlice {
            label: PIE_BUCKET_NAMES
                .get(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format_number(axis.starts[i])),
            value: if total > 0.0 {
                bucket.count as f64 / total * 100.0
            } else {
                0.0
            },
        })
        .filter(|slice| slice.value > 0.0)
        .collect();
    ChartData::Pie { slices }
}

fn percent_values(hist: &Histogram, log_y: bool) -> Vec<f64> {
    let total = hist.count as f64;
    hist.buckets
        .iter()
        .map(|bucket| {
            let share = if total > 0.0 {
                bucket.count as f64 / total * 100.0
            } else {
                0.0
            };
            if log_y {
                share.log10()
            } else {
                share
            }
        })
        .collect()
}

fn subtitle_for(params: &ResolvedParams, key: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !key.is_empty() {
        parts.push(format!("key: {key}"));
    }
    if let Some(compare) = &params.compare {
        parts.push(format!("compare: {compare}"));
    }
    if !params.filters.is_empty() {
        let filters: Vec<String> = params
            .filters
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        parts.push(format!("filters: {}", filters.join(" ")));
    }
    if params.sanitize {
        parts.push("(sanitized)".to_string());
    }
    parts.join(" ")
}

/// Compact magnitude formatting for bucket boundaries ("1.5k", "2M").
pub fn format_number(number: f64) -> String {
    if number.is_nan() {
        return "NaN".to_string();
    }
    if number.is_infinite() {
        return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = number.abs();
    if magnitude >= 1e3 && magnitude < 1e15 {
        let exponent = magnitude.log10().floor();
        let interval = 10f64.powf((exponent / 3.0).floor() * 3.0);
        let unit = match interval as u64 {
            1_000 => "k",
            1_000_000 => "M",
            1_000_000_000 => "B",
            _ => "T",
        };
        return format!(
            "{}{unit}",
            trim_float((number * 100.0 / interval).round() / 100.0)
        );
    }
    trim_float((number * 100.0).round() / 100.0)
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
