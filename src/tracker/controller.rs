use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use log::info;

use crate::{
    accuracy::{
        calculate_accuracy_with, classify_magnitude_with, get_chart_data_with,
        measurement_history, resolve_current_period, sort_by_time, AccuracyConfig, AccuracyStats,
        ChartData, Magnitude, MeasurementDrift,
    },
    db::{Database, Measurement, NewWatch, Watch, WatchSummary, WatchUpdate},
    reference::{
        DeviceClock, NetworkClock, NoNetwork, ReferenceTime, ReferenceTimeService, SystemClock,
        WatchFaceTime,
    },
    transfer::{parse_import, to_json, ImportMode, ImportResult},
};

/// Ties the store, the reference clock and the accuracy engine together.
/// Every figure is recomputed from the stored measurements on request.
pub struct WatchTracker<N = NoNetwork, D = SystemClock> {
    db: Database,
    clock: ReferenceTimeService<N, D>,
    config: AccuracyConfig,
}

impl<N: NetworkClock, D: DeviceClock> WatchTracker<N, D> {
    pub fn new(db: Database, clock: ReferenceTimeService<N, D>) -> Self {
        Self::with_config(db, clock, AccuracyConfig::default())
    }

    pub fn with_config(db: Database, clock: ReferenceTimeService<N, D>, config: AccuracyConfig) -> Self {
        Self { db, clock, config }
    }

    pub async fn add_watch(&self, mut input: NewWatch) -> Result<Watch> {
        input.name = required_name(&input.name)?;
        let watch = self.db.insert_watch(input).await?;
        info!("Added watch {} ({})", watch.name, watch.id);
        Ok(watch)
    }

    pub async fn update_watch(&self, watch_id: &str, mut update: WatchUpdate) -> Result<Watch> {
        if let Some(name) = update.name.as_deref() {
            update.name = Some(required_name(name)?);
        }
        let watch = self.db.update_watch(watch_id, update).await?;
        info!("Updated watch {}", watch.id);
        Ok(watch)
    }

    pub async fn delete_watch(&self, watch_id: &str) -> Result<()> {
        self.db.delete_watch(watch_id).await?;
        info!("Deleted watch {watch_id} and its measurements");
        Ok(())
    }

    pub async fn get_watch(&self, watch_id: &str) -> Result<Option<Watch>> {
        self.db.get_watch(watch_id).await
    }

    /// Look a watch up by id, falling back to a case-insensitive name match.
    pub async fn resolve_watch(&self, id_or_name: &str) -> Result<Watch> {
        if let Some(watch) = self.db.get_watch(id_or_name).await? {
            return Ok(watch);
        }
        self.db
            .find_watch_by_name(id_or_name)
            .await?
            .ok_or_else(|| anyhow!("No watch with id or name {id_or_name:?}"))
    }

    /// Every watch with the headline numbers of its current period, newest
    /// watch first.
    pub async fn list_watches(&self) -> Result<Vec<WatchSummary>> {
        let watches = self.db.list_watches().await?;
        let mut summaries = Vec::with_capacity(watches.len());
        for watch in watches {
            let measurements = self.db.get_measurements(&watch.id).await?;
            summaries.push(self.summarize(watch, &measurements));
        }
        Ok(summaries)
    }

    pub async fn summary(&self, watch_id: &str) -> Result<WatchSummary> {
        let watch = self.require_watch(watch_id).await?;
        let measurements = self.db.get_measurements(watch_id).await?;
        Ok(self.summarize(watch, &measurements))
    }

    /// Capture a dial reading against the reference clock.
    pub async fn record_measurement(
        &self,
        watch_id: &str,
        dial: WatchFaceTime,
        baseline: bool,
    ) -> Result<Measurement> {
        let reference = self.clock.reference_time().await;
        let watch_time = dial.resolve_against(reference.timestamp)?;
        self.store_reading(watch_id, watch_time, reference, baseline)
            .await
    }

    /// Like [`Self::record_measurement`] with the watch time already
    /// resolved to an instant.
    pub async fn record_reading(
        &self,
        watch_id: &str,
        watch_time: DateTime<Utc>,
        baseline: bool,
    ) -> Result<Measurement> {
        let reference = self.clock.reference_time().await;
        self.store_reading(watch_id, watch_time, reference, baseline)
            .await
    }

    /// Start a new tracking period. Older measurements stay in history.
    pub async fn reset_baseline(&self, watch_id: &str, dial: WatchFaceTime) -> Result<Measurement> {
        self.record_measurement(watch_id, dial, true).await
    }

    /// Remove one measurement and return it. Deleting a baseline hands its
    /// period back to the previous baseline.
    pub async fn delete_measurement(&self, measurement_id: &str) -> Result<Measurement> {
        let measurement = self
            .db
            .get_measurement(measurement_id)
            .await?
            .ok_or_else(|| anyhow!("Measurement {measurement_id} not found"))?;
        self.db.delete_measurement(measurement_id).await?;
        info!(
            "Deleted {} {measurement_id} of watch {}",
            if measurement.is_baseline { "baseline" } else { "measurement" },
            measurement.watch_id
        );
        Ok(measurement)
    }

    /// Remove every watch and measurement.
    pub async fn clear_all(&self) -> Result<()> {
        self.db.clear_all_data().await?;
        info!("Cleared all watches and measurements");
        Ok(())
    }

    /// All measurements of a watch, oldest first.
    pub async fn measurements(&self, watch_id: &str) -> Result<Vec<Measurement>> {
        self.require_watch(watch_id).await?;
        self.db.get_measurements(watch_id).await
    }

    /// Newest first, each with its drift against the baseline in force.
    pub async fn history(&self, watch_id: &str) -> Result<Vec<MeasurementDrift>> {
        let measurements = self.measurements(watch_id).await?;
        Ok(measurement_history(&measurements))
    }

    pub async fn accuracy(&self, watch_id: &str) -> Result<AccuracyStats> {
        let measurements = self.measurements(watch_id).await?;
        Ok(calculate_accuracy_with(&measurements, &self.config))
    }

    pub async fn chart(&self, watch_id: &str) -> Result<ChartData> {
        let measurements = self.measurements(watch_id).await?;
        Ok(get_chart_data_with(&measurements, &self.config))
    }

    pub fn magnitude(&self, seconds_per_day: Option<f64>) -> Magnitude {
        classify_magnitude_with(seconds_per_day, &self.config)
    }

    /// Pretty JSON backup of every watch and measurement.
    pub async fn export_all(&self) -> Result<String> {
        let data = self.db.export_all().await?;
        info!("Exporting {} watches", data.data.watches.len());
        to_json(&data)
    }

    pub async fn import(&self, json: &str, mode: ImportMode) -> Result<ImportResult> {
        let data = parse_import(json)?;
        self.db.import_data(data, mode).await
    }

    async fn store_reading(
        &self,
        watch_id: &str,
        watch_time: DateTime<Utc>,
        reference: ReferenceTime,
        baseline: bool,
    ) -> Result<Measurement> {
        if !self.db.watch_exists(watch_id).await? {
            bail!("Watch {watch_id} not found");
        }

        // A watch's first measurement always opens a period.
        let is_baseline = baseline || self.db.count_measurements(watch_id).await? == 0;
        let measurement = Measurement::capture(
            watch_id,
            watch_time,
            reference.timestamp,
            reference.source,
            is_baseline,
        );
        self.db
            .insert_measurement(&measurement)
            .await
            .with_context(|| format!("failed to store measurement for watch {watch_id}"))?;

        info!(
            "Recorded {} for watch {watch_id}: offset {}ms ({})",
            if is_baseline { "baseline" } else { "measurement" },
            measurement.delta_ms,
            measurement.time_source.as_str()
        );
        Ok(measurement)
    }

    async fn require_watch(&self, watch_id: &str) -> Result<Watch> {
        self.db
            .get_watch(watch_id)
            .await?
            .ok_or_else(|| anyhow!("Watch {watch_id} not found"))
    }

    fn summarize(&self, watch: Watch, measurements: &[Measurement]) -> WatchSummary {
        let period = resolve_current_period(measurements);
        let stats = calculate_accuracy_with(measurements, &self.config);
        WatchSummary {
            watch,
            current_baseline: period.baseline.cloned(),
            measurement_count: period.len(),
            latest_offset_ms: sort_by_time(measurements).last().map(|m| m.delta_ms),
            seconds_per_day: stats.seconds_per_day,
        }
    }
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Watch name must not be empty");
    }
    Ok(name.to_string())
}
