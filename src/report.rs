//! Numerical results of one planning run, written as JSON

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::ScenarioData;
use crate::fluid::{FluidTrajectory, Objective};
use crate::optimizer::PlanningOutcome;
use crate::simulation::SimulationReport;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fluid-model view of the chosen plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidSummary {
    pub objective: Objective,
    pub objective_value: f64,
    pub mean_unsheltered: f64,
    pub mean_sheltered: f64,
    pub mean_housed: f64,
    pub peak_unsheltered_day: Option<usize>,
    pub peak_unsheltered: Option<f64>,
    pub trajectory: FluidTrajectory,
}

impl FluidSummary {
    pub fn new(trajectory: FluidTrajectory, objective: Objective, shelter_weight: f64) -> Self {
        let peak = trajectory.peak_unsheltered();
        Self {
            objective,
            objective_value: objective.evaluate(&trajectory, shelter_weight),
            mean_unsheltered: trajectory.mean_unsheltered(),
            mean_sheltered: trajectory.mean_sheltered(),
            mean_housed: trajectory.mean_housed(),
            peak_unsheltered_day: peak.map(|(day, _)| day),
            peak_unsheltered: peak.map(|(_, value)| value),
            trajectory,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericalResults {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub scenario: ScenarioData,
    pub planning: PlanningOutcome,
    pub fluid: FluidSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationReport>,
}

impl NumericalResults {
    pub fn new(
        scenario: ScenarioData,
        planning: PlanningOutcome,
        fluid: FluidSummary,
        simulation: Option<SimulationReport>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            scenario,
            planning,
            fluid,
            simulation,
        }
    }

    /// Write pretty JSON, creating parent directories as needed
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let io_err = |source| ReportError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;

        info!(run_id = %self.run_id, path = %path.display(), "numerical results written");
        Ok(())
    }
}
