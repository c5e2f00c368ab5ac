use serde::{Deserialize, Serialize};
use strum::Display;

use super::FluidTrajectory;

/// How a fluid trajectory is scored; lower is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Objective {
    /// `mean(u) + c * mean(s)`
    Linear,
    /// `mean(u^2) + c * mean(s^2)`
    Quadratic,
}

impl Objective {
    pub fn evaluate(&self, trajectory: &FluidTrajectory, shelter_weight: f64) -> f64 {
        match self {
            Objective::Linear => {
                trajectory.mean_unsheltered() + shelter_weight * trajectory.mean_sheltered()
            }
            Objective::Quadratic => {
                trajectory.mean_unsheltered_sq() + shelter_weight * trajectory.mean_sheltered_sq()
            }
        }
    }
}
