use std::time::Instant;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use validator::Validate;

use super::{Replication, ReplicationResult};
use crate::capacity::{plan_profiles, DAYS_PER_YEAR};
use crate::domain::{CapacityPlan, PerKind, PlanError, ScenarioData, ScenarioError};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid simulation settings: {0}")]
    Settings(#[from] validator::ValidationErrors),
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("At least one replication is required")]
    NoReplications,
    #[error("Build interval must be positive, got {0} days")]
    InvalidBuildInterval(f64),
    #[error("Percentile must be within (50, 100], got {0}")]
    InvalidPercentile(f64),
    #[error("Distribution error: {0}")]
    Distribution(String),
    #[error("Simulation cancelled after {completed} replications")]
    Cancelled { completed: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulationSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub replications: usize,
    /// Years of building before arrivals start
    #[validate(range(min = 0.0))]
    pub warm_up_years: f64,
    /// Days between development steps
    #[validate(range(min = 0.0))]
    pub build_interval_days: f64,
    pub seed: u64,
    /// Upper percentile of the fan chart; the lower one is `100 - percentile`
    #[validate(range(exclusive_min = 50.0, max = 100.0))]
    pub percentile: f64,
}

fn default_enabled() -> bool {
    true
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            replications: 100,
            warm_up_years: 1.0,
            build_interval_days: 1.0,
            seed: 42,
            percentile: 90.0,
        }
    }
}

/// Percentile bands of the unsheltered count across replications
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanChart {
    pub times_years: Vec<f64>,
    pub low: Vec<f64>,
    pub median: Vec<f64>,
    pub high: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub replications: usize,
    pub percentile: f64,
    pub fan_chart: FanChart,
    /// Time-averaged unsheltered count of each replication
    pub average_unsheltered: Vec<f64>,
    pub mean_average_unsheltered: f64,
    pub std_average_unsheltered: f64,
    pub mean_waiting_housing: f64,
    pub mean_arrivals: f64,
    pub mean_exits: f64,
    pub time_taken_ms: u64,
    #[serde(skip)]
    pub runs: Vec<ReplicationResult>,
}

/// Runs independent replications of the care system under one plan
pub struct SimulationModel {
    data: ScenarioData,
    settings: SimulationSettings,
    profiles: PerKind<Vec<f64>>,
    cancel: CancellationToken,
}

impl SimulationModel {
    pub fn new(
        data: &ScenarioData,
        settings: &SimulationSettings,
        plan: &CapacityPlan,
    ) -> Result<Self, SimulationError> {
        data.validate()?;
        if settings.replications == 0 {
            return Err(SimulationError::NoReplications);
        }
        if !(settings.build_interval_days > 0.0) {
            return Err(SimulationError::InvalidBuildInterval(settings.build_interval_days));
        }
        settings.validate()?;
        plan.validate(data)?;

        if data.initial_unsheltered() < 0.0 {
            warn!(
                initial_unsheltered = data.initial_unsheltered(),
                "initial capacity exceeds demand; the first unsheltered count is negative"
            );
        }

        let profiles = plan_profiles(plan, data.decision_years, data.extra_years)?;
        Ok(Self {
            data: data.clone(),
            settings: settings.clone(),
            profiles,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop between replications once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Run replication `r`, seeded with `seed + r`
    pub fn run_replication(&self, r: usize) -> Result<ReplicationResult, SimulationError> {
        let seed = self.settings.seed.wrapping_add(r as u64);
        let result = Replication::new(&self.data, &self.settings, &self.profiles, seed)?.run();
        debug!(
            replication = r,
            arrivals = result.arrivals,
            mean_unsheltered = result.mean_unsheltered,
            "replication finished"
        );
        Ok(result)
    }

    /// Run every replication and summarise the unsheltered count
    pub fn analyse(&self, percentile: f64) -> Result<SimulationReport, SimulationError> {
        if !(percentile > 50.0 && percentile <= 100.0) {
            return Err(SimulationError::InvalidPercentile(percentile));
        }

        let started = Instant::now();
        let mut runs = Vec::with_capacity(self.settings.replications);
        for r in 0..self.settings.replications {
            if self.cancel.is_cancelled() {
                return Err(SimulationError::Cancelled { completed: r });
            }
            runs.push(self.run_replication(r)?);
        }

        let fan_chart = self.fan_chart(&runs, percentile);
        let average_unsheltered: Vec<f64> = runs.iter().map(|r| r.mean_unsheltered).collect();
        let mean_average_unsheltered = average_unsheltered.iter().mean();
        let std_average_unsheltered = if runs.len() > 1 {
            average_unsheltered.iter().std_dev()
        } else {
            0.0
        };
        let mean_of = |f: fn(&ReplicationResult) -> f64| runs.iter().map(f).mean();

        let report = SimulationReport {
            replications: runs.len(),
            percentile,
            fan_chart,
            mean_average_unsheltered,
            std_average_unsheltered,
            mean_waiting_housing: mean_of(|r| r.mean_waiting_housing),
            mean_arrivals: mean_of(|r| r.arrivals as f64),
            mean_exits: mean_of(|r| r.exits as f64),
            average_unsheltered,
            time_taken_ms: started.elapsed().as_millis() as u64,
            runs,
        };

        info!(
            replications = report.replications,
            mean_unsheltered = (report.mean_average_unsheltered * 100.0).round() / 100.0,
            std_unsheltered = (report.std_average_unsheltered * 100.0).round() / 100.0,
            time_taken_ms = report.time_taken_ms,
            "simulation finished"
        );
        Ok(report)
    }

    fn fan_chart(&self, runs: &[ReplicationResult], percentile: f64) -> FanChart {
        let points = runs
            .iter()
            .map(|r| r.unsheltered_over_time.len())
            .min()
            .unwrap_or(0);
        let step = self.settings.build_interval_days / DAYS_PER_YEAR as f64;

        let mut chart = FanChart {
            times_years: (0..points).map(|i| i as f64 * step).collect(),
            ..FanChart::default()
        };

        for i in 0..points {
            let mut column: Vec<f64> = runs.iter().map(|r| r.unsheltered_over_time[i]).collect();
            column.sort_by(f64::total_cmp);
            chart.low.push(linear_percentile(&column, 100.0 - percentile));
            chart.median.push(linear_percentile(&column, 50.0));
            chart.high.push(linear_percentile(&column, percentile));
        }
        chart
    }
}

/// Percentile of sorted values, interpolating linearly between order
/// statistics at rank `(n - 1) * p / 100`
pub fn linear_percentile(sorted: &[f64], percentile: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return f64::NAN;
    };
    let rank = (sorted.len() - 1) as f64 * (percentile / 100.0).clamp(0.0, 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if upper >= sorted.len() {
        return last;
    }
    sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower])
}
