//! Render-pass orchestration: resolve parameters, fan out the evolution
//! fetches for the selected mode, join them, and reshape the results into
//! chart blocks on the mount.
use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::chart::{build_key_chart, ChartBlock, Mount};
use crate::domain::model::TaggedEvolutions;
use crate::domain::options::sensible_filter_options;
use crate::domain::params::{ChartParams, ResolvedParams};
use crate::domain::regroup::{limit_keys, regroup_by_key, sort_by_tag};
use crate::ports::source::{MetricsSource, SourceError};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("no data to graph")]
    NoData,
}

pub struct Composer<S: MetricsSource> {
    source: S,
}

impl<S: MetricsSource> Composer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one render pass, appending chart blocks to `mount`. Failures never
    /// propagate: a fetch error or an empty result set becomes a single
    /// error block echoing the parameters.
    pub async fn render(&self, params: ChartParams, mount: &mut Mount) {
        // The version list is only needed to default the version or to build
        // an evolution window.
        let needs_versions = params.version.is_none() || params.evo_versions.unwrap_or(0) > 0;
        let version_list = if needs_versions {
            match self.source.list_versions().await {
                Ok(list) => list,
                Err(error) => {
                    warn!(%error, "failed to list versions");
                    mount.push_error(format!("Failed to fetch data: {error}"), echo(&params));
                    return;
                }
            }
        } else {
            Vec::new()
        };

        let params = params.resolve(&version_list);
        info!(
            channel = %params.channel,
            version = %params.version,
            metric = %params.metric,
            compare = ?params.compare,
            evo_versions = params.evo_versions,
            "render pass"
        );

        match self.compose(&params, &version_list).await {
            Ok(blocks) => {
                for block in blocks {
                    mount.push_chart(block);
                }
            }
            Err(ComposeError::NoData) => {
                mount.push_error("No data to graph", echo(&params));
            }
            Err(error) => {
                warn!(%error, "render pass failed");
                mount.push_error(format!("Failed to fetch data: {error}"), echo(&params));
            }
        }
    }

    async fn compose(
        &self,
        params: &ResolvedParams,
        version_list: &[String],
    ) -> Result<Vec<ChartBlock>, ComposeError> {
        let mut maps = self.fetch_tagged(params, version_list).await?;
        sort_by_tag(&mut maps);

        let groups = limit_keys(regroup_by_key(maps), params.key_limit);
        if groups.is_empty() {
            return Err(ComposeError::NoData);
        }
        debug!(keys = groups.len(), "regrouped evolutions");

        Ok(groups
            .into_iter()
            .filter_map(|group| build_key_chart(params, group))
            .collect())
    }

    /// Issue the fetches for the selected mode concurrently and join them.
    /// Any rejection fails the whole pass; partial renders are worse than an
    /// honest error.
    async fn fetch_tagged(
        &self,
        params: &ResolvedParams,
        version_list: &[String],
    ) -> Result<Vec<TaggedEvolutions>, SourceError> {
        if params.evo_versions > 0 {
            let window = params.evolution_window(version_list);
            debug!(versions = window.len(), "evolution-over-versions fetch");
            let fetches = window.into_iter().map(|version| async move {
                let evolutions = self
                    .source
                    .fetch_evolution(
                        &params.channel,
                        &version,
                        &params.metric,
                        &params.filters,
                        params.use_submission_date,
                    )
                    .await?;
                Ok(TaggedEvolutions {
                    tag: Some(version),
                    evolutions,
                })
            });
            return try_join_all(fetches).await;
        }

        if let Some(compare) = &params.compare {
            let mut options = self
                .source
                .list_filter_options(&params.channel, &params.version)
                .await?;
            let values = options.remove(compare).unwrap_or_default();
            let values = if params.sensible_compare {
                sensible_filter_options(compare, values)
            } else {
                values
            };
            debug!(dimension = %compare, candidates = values.len(), "compare fetch");
            let fetches = values.into_iter().map(|value| {
                let mut filters = params.filters.clone();
                filters.insert(compare.clone(), value.clone());
                async move {
                    let evolutions = self
                        .source
                        .fetch_evolution(
                            &params.channel,
                            &params.version,
                            &params.metric,
                            &filters,
                            params.use_submission_date,
                        )
                        .await?;
                    Ok(TaggedEvolutions {
                        tag: Some(value),
                        evolutions,
                    })
                }
            });
            return try_join_all(fetches).await;
        }

        let evolutions = self
            .source
            .fetch_evolution(
                &params.channel,
                &params.version,
                &params.metric,
                &params.filters,
                params.use_submission_date,
            )
            .await?;
        Ok(vec![TaggedEvolutions {
            tag: None,
            evolutions,
        }])
    }
}

fn echo<T: serde::Serialize>(params: &T) -> String {
    serde_json::to_string_pretty(params).unwrap_or_else(|_| "{}".to_string())
}
