use std::fs;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use super::{resolve_data_dir, Cli, Commands, WatchCommand, DATABASE_FILE, SETTINGS_FILE};
use crate::{
    accuracy::{format_accuracy, format_offset, AccuracyStats},
    db::{Database, Measurement, NewWatch, WatchSummary, WatchUpdate},
    reference::{format_time, format_time_short, ReferenceTimeService, WatchFaceTime},
    settings::{ReferenceTimeSettings, SettingsStore},
    tracker::WatchTracker,
};

type Tracker = WatchTracker;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchDetail {
    #[serde(flatten)]
    summary: WatchSummary,
    accuracy: AccuracyStats,
}

pub async fn execute(cli: Cli) -> Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir)?;
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
    let json = cli.json;

    let db = Database::new(data_dir.join(DATABASE_FILE))?;
    let clock = ReferenceTimeService::device_only(settings.reference_time());
    let network_enabled = clock.network_enabled();
    let tracker = Tracker::new(db, clock);

    match cli.command {
        Commands::Watch { action } => watch_command(&tracker, action, json).await,
        Commands::Measure {
            watch,
            time,
            baseline,
        } => {
            let dial: WatchFaceTime = time.parse()?;
            let watch = tracker.resolve_watch(&watch).await?;
            let measurement = tracker.record_measurement(&watch.id, dial, baseline).await?;
            print_measurement(&measurement, json)
        }
        Commands::Baseline { watch, time } => {
            let dial: WatchFaceTime = time.parse()?;
            let watch = tracker.resolve_watch(&watch).await?;
            let measurement = tracker.reset_baseline(&watch.id, dial).await?;
            print_measurement(&measurement, json)
        }
        Commands::History { watch, limit } => {
            let watch = tracker.resolve_watch(&watch).await?;
            let mut history = tracker.history(&watch.id).await?;
            if let Some(limit) = limit {
                history.truncate(limit);
            }
            if json {
                return print_json(&history);
            }
            if history.is_empty() {
                println!("No measurements for {} yet", watch.name);
            }
            for entry in &history {
                let m = &entry.measurement;
                let rate = entry.drift.and_then(|d| d.seconds_per_day);
                println!(
                    "{} {}  offset {:>8}  {:>12}  {:<8}{}  {}",
                    local_date(m.device_time),
                    format_time(m.device_time),
                    format_offset(m.delta_ms),
                    format_accuracy(rate),
                    m.time_source.as_str(),
                    if m.is_baseline { " baseline" } else { "" },
                    m.id
                );
            }
            Ok(())
        }
        Commands::Stats { watch } => {
            let watch = tracker.resolve_watch(&watch).await?;
            let stats = tracker.accuracy(&watch.id).await?;
            if json {
                return print_json(&stats);
            }
            println!("{}", watch.name);
            print_stats(&tracker, &stats);
            Ok(())
        }
        Commands::Chart { watch } => {
            let watch = tracker.resolve_watch(&watch).await?;
            let chart = tracker.chart(&watch.id).await?;
            if json {
                return print_json(&chart);
            }
            match &chart.baseline {
                Some(baseline) => println!(
                    "Baseline {} {}",
                    local_date(baseline.device_time),
                    format_time_short(baseline.device_time)
                ),
                None => println!("No tracking period yet"),
            }
            for point in &chart.points {
                println!("day {:>7.2}  {}", point.x, format_accuracy(Some(point.y)));
            }
            if let Some(line) = chart.regression_line {
                println!(
                    "rate {} from day {:.2} to day {:.2}",
                    format_accuracy(Some(line.start.y)),
                    line.start.x,
                    line.end.x
                );
            }
            Ok(())
        }
        Commands::DeleteMeasurement { id } => {
            let deleted = tracker.delete_measurement(&id).await?;
            if json {
                return print_json(&deleted);
            }
            println!(
                "Deleted {} {id} taken {} {}",
                if deleted.is_baseline { "baseline" } else { "measurement" },
                local_date(deleted.device_time),
                format_time_short(deleted.device_time)
            );
            Ok(())
        }
        Commands::Export { output } => {
            let document = tracker.export_all().await?;
            match output {
                Some(path) => {
                    fs::write(&path, &document)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    if !json {
                        println!("Exported to {}", path.display());
                    }
                }
                None => println!("{document}"),
            }
            Ok(())
        }
        Commands::Import { file, mode } => {
            let document = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let result = tracker.import(&document, mode.into()).await?;
            if json {
                return print_json(&result);
            }
            println!(
                "Imported {} watches ({} skipped) and {} measurements ({} skipped)",
                result.watches_imported,
                result.watches_skipped,
                result.measurements_imported,
                result.measurements_skipped
            );
            Ok(())
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("This deletes every watch and measurement; pass --yes to confirm");
            }
            tracker.clear_all().await?;
            if !json {
                println!("Deleted all watches and measurements");
            }
            Ok(())
        }
        Commands::Settings => settings_command(&settings, network_enabled, json),
    }
}

async fn watch_command(tracker: &Tracker, action: WatchCommand, json: bool) -> Result<()> {
    match action {
        WatchCommand::Add {
            name,
            brand,
            model,
            movement,
        } => {
            let watch = tracker
                .add_watch(NewWatch {
                    name,
                    brand,
                    model,
                    movement_type: movement.into(),
                })
                .await?;
            if json {
                return print_json(&watch);
            }
            println!("Added {} ({})", watch.name, watch.id);
            Ok(())
        }
        WatchCommand::List => {
            let summaries = tracker.list_watches().await?;
            if json {
                return print_json(&summaries);
            }
            if summaries.is_empty() {
                println!("No watches yet. Add one with `watchdrift watch add <name>`.");
            }
            for summary in &summaries {
                let rate = summary.seconds_per_day;
                println!(
                    "{:<24} {:>12} {:<7} {:<9} {:>3} in period  {}",
                    summary.watch.name,
                    format_accuracy(rate),
                    tracker.magnitude(rate).as_str(),
                    summary.watch.movement_type.as_str(),
                    summary.measurement_count,
                    summary.watch.id
                );
            }
            Ok(())
        }
        WatchCommand::Show { watch } => {
            let watch = tracker.resolve_watch(&watch).await?;
            let detail = WatchDetail {
                summary: tracker.summary(&watch.id).await?,
                accuracy: tracker.accuracy(&watch.id).await?,
            };
            if json {
                return print_json(&detail);
            }

            let watch = &detail.summary.watch;
            println!("{} ({})", watch.name, watch.id);
            let make: Vec<&str> = [watch.brand.as_deref(), watch.model.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !make.is_empty() {
                println!("  {}", make.join(" "));
            }
            println!("  movement:    {}", watch.movement_type.as_str());
            if let Some(offset) = detail.summary.latest_offset_ms {
                println!("  last offset: {}", format_offset(offset));
            }
            if let Some(baseline) = &detail.summary.current_baseline {
                println!(
                    "  baseline:    {} {}",
                    local_date(baseline.device_time),
                    format_time_short(baseline.device_time)
                );
            }
            print_stats(tracker, &detail.accuracy);
            Ok(())
        }
        WatchCommand::Edit {
            watch,
            name,
            brand,
            model,
            movement,
            clear_brand,
            clear_model,
        } => {
            let watch = tracker.resolve_watch(&watch).await?;
            let update = WatchUpdate {
                name,
                brand: if clear_brand { Some(None) } else { brand.map(Some) },
                model: if clear_model { Some(None) } else { model.map(Some) },
                movement_type: movement.map(Into::into),
            };
            if update.is_empty() {
                bail!("Nothing to change; pass --name, --brand, --model or --movement");
            }
            let watch = tracker.update_watch(&watch.id, update).await?;
            if json {
                return print_json(&watch);
            }
            println!("Updated {} ({})", watch.name, watch.id);
            Ok(())
        }
        WatchCommand::Remove { watch } => {
            let watch = tracker.resolve_watch(&watch).await?;
            tracker.delete_watch(&watch.id).await?;
            if !json {
                println!("Removed {} and its measurements", watch.name);
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
    #[serde(flatten)]
    reference_time: ReferenceTimeSettings,
    network_enabled: bool,
    path: String,
}

fn settings_command(store: &SettingsStore, network_enabled: bool, json: bool) -> Result<()> {
    let view = SettingsView {
        reference_time: store.reference_time(),
        network_enabled,
        path: store.path().display().to_string(),
    };
    if json {
        return print_json(&view);
    }
    let settings = &view.reference_time;
    println!("prefer network: {}", settings.prefer_network);
    println!("servers:        {}", settings.servers.join(", "));
    println!("timeout:        {}ms", settings.timeout_ms);
    println!("cache ttl:      {}ms", settings.cache_ttl_ms);
    if !network_enabled {
        println!("network time:   no client configured, captures use the device clock");
    }
    println!("file:           {}", view.path);
    Ok(())
}

fn print_measurement(measurement: &Measurement, json: bool) -> Result<()> {
    if json {
        return print_json(measurement);
    }
    println!(
        "Recorded {} at {}: offset {} ({} time)",
        if measurement.is_baseline { "baseline" } else { "measurement" },
        format_time_short(measurement.device_time),
        format_offset(measurement.delta_ms),
        measurement.time_source.as_str()
    );
    Ok(())
}

fn print_stats(tracker: &Tracker, stats: &AccuracyStats) {
    let rate = stats.seconds_per_day;
    println!("  rate:        {} ({})", format_accuracy(rate), tracker.magnitude(rate).as_str());
    println!("  trend:       {}", stats.trend.as_str());
    println!("  confidence:  {}", stats.confidence.as_str());
    println!("  tracked:     {:.2} days", stats.elapsed_days);
    println!("  drift:       {}", format_offset(stats.total_drift_ms));
    println!("  readings:    {}", stats.measurement_count);
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn local_date(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%Y-%m-%d").to_string()
}
