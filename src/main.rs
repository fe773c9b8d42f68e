use std::path::PathBuf;

use telechart::app::analytics::AnalyticsSender;
use telechart::app::composer::Composer;
use telechart::domain::chart::{format_number, Block, ChartData, Mount};
use telechart::domain::params::ChartParams;
use telechart::infra::{
  beacon_queue::QueuedBeacon,
  config::ConfigLoader,
  http_source::AggregatesSource,
  logging::{init_logging, BootError},
  system_clock::SystemClock,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), BootError> {
  let mut args = std::env::args().skip(1);
  let cfg_path = pick_config_path(args.next());
  let params: ChartParams = match args.next() {
    Some(json) => serde_json::from_str(&json)
      .map_err(|e| BootError::Fatal(format!("bad params JSON: {e}")))?,
    None => ChartParams::default(),
  };

  let cfg = ConfigLoader::load(&cfg_path)
    .await
    .map_err(|e| BootError::Fatal(e.to_string()))?;
  init_logging(&cfg.log_level);
  info!(base_url = %cfg.aggregates_base_url, "Loaded config");

  let source = AggregatesSource::new(cfg.aggregates_base_url.clone(), cfg.user_agent.clone())
    .map_err(|e| BootError::Fatal(e.to_string()))?;
  let beacon_client = reqwest::Client::builder()
    .user_agent(cfg.user_agent.clone())
    .build()
    .ok()
    .map(|client| QueuedBeacon::spawn(client, cfg.beacon_queue_depth));
  let analytics = AnalyticsSender::new(
    cfg.do_not_track,
    cfg.beacon_endpoint.clone(),
    beacon_client,
    SystemClock,
  )
  .await;

  let composer = Composer::new(source);
  let mut mount = Mount::default();
  composer.render(params, &mut mount).await;
  analytics.send("render", "chart", None, None).await;

  print_mount(&mount);
  Ok(())
}

fn print_mount(mount: &Mount) {
  for block in &mount.blocks {
    match block {
      Block::Error(error) => {
        println!("error: {}", error.message);
        println!("{}", error.params_echo);
      }
      Block::Chart(chart) => {
        println!("== {}", chart.title);
        if !chart.subtitle.is_empty() {
          println!("   {}", chart.subtitle);
        }
        match &chart.data {
          ChartData::Pie { slices } => {
            for slice in slices {
              println!("  {:10} {:.2}%", slice.label, slice.value);
            }
          }
          ChartData::Histogram {
            axis,
            values,
            log_y,
            ..
          } => {
            for (i, value) in values.iter().enumerate() {
              println!("  {:16} {}%", axis.label(i), display_percent(*value, *log_y));
            }
          }
          ChartData::MultiLine { axis, series, log_y, .. } => {
            for line in series {
              println!("  -- {}", line.label);
              for (i, value) in line.values.iter().enumerate() {
                println!("     {:16} {}%", axis.label(i), display_percent(*value, *log_y));
              }
            }
          }
          ChartData::TimeSeries {
            lines,
            y_label,
            values_are_percent,
            ..
          } => {
            println!("   {y_label}");
            for line in lines {
              println!("  -- {}", line.label);
              for (date, value) in &line.points {
                let suffix = if *values_are_percent { "%" } else { "" };
                println!("     {date} {}{suffix}", format_number(*value));
              }
            }
          }
        }
      }
    }
  }
}

fn display_percent(value: f64, log_y: bool) -> String {
  // Log-scaled values are stored as log10; undo that for display.
  let value = if log_y { 10f64.powf(value) } else { value };
  format_number(value)
}

fn pick_config_path(arg1: Option<String>) -> PathBuf {
  if let Some(p) = arg1 {
    return PathBuf::from(p);
  }
  PathBuf::from("res/config.toml")
}
