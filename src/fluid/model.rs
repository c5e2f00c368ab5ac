use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capacity::{plan_profiles, DAYS_PER_YEAR};
use crate::domain::{CapacityPlan, PlanError, ScenarioData};

/// Fluid approximation of the M(t)/M/s(t) care system
///
/// People flow in at the daily arrival rate and flow out of housing at
/// `mu * h` per day. Whoever is in the system but not housed or sheltered is
/// unsheltered.
#[derive(Debug, Clone)]
pub struct FluidFlowModel {
    initial_demand: f64,
    /// Daily per-unit housing service rate
    mu: f64,
    /// Daily arrival rate per modelled day
    arrivals: Vec<f64>,
    housing: Vec<f64>,
    shelter: Vec<f64>,
}

/// Daily expected occupancy produced by [`FluidFlowModel::analyse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidTrajectory {
    pub housed: Vec<f64>,
    pub sheltered: Vec<f64>,
    pub unsheltered: Vec<f64>,
}

impl FluidFlowModel {
    pub fn new(data: &ScenarioData, plan: &CapacityPlan) -> Result<Self, PlanError> {
        plan.validate(data)?;
        Self::from_plan(data, plan)
    }

    /// Build without checking the plan against the initial capacity.
    ///
    /// The planner uses this to evaluate the model at arbitrary decision vectors.
    pub(crate) fn from_plan(data: &ScenarioData, plan: &CapacityPlan) -> Result<Self, PlanError> {
        let profiles = plan_profiles(plan, data.decision_years, data.extra_years)?;
        let days = profiles.housing.len();

        let arrivals = (0..days)
            .map(|day| data.arrival_rate_at((day / DAYS_PER_YEAR) as f64) / DAYS_PER_YEAR as f64)
            .collect();

        if days > 50 * DAYS_PER_YEAR {
            warn!(days, "fluid model horizon is unusually long");
        }

        Ok(Self {
            initial_demand: f64::from(data.initial_demand),
            mu: 1.0 / (data.service_mean.housing * DAYS_PER_YEAR as f64),
            arrivals,
            housing: profiles.housing,
            shelter: profiles.shelter,
        })
    }

    pub fn days(&self) -> usize {
        self.housing.len()
    }

    /// Evaluate the expected occupancy on every modelled day
    pub fn analyse(&self) -> FluidTrajectory {
        let days = self.days();
        let mut unsheltered = Vec::with_capacity(days);
        let mut inflow = 0.0;
        let mut outflow = 0.0;

        for day in 0..days {
            unsheltered.push(
                self.initial_demand + inflow - outflow - self.housing[day] - self.shelter[day],
            );

            inflow += self.arrivals[day];
            outflow += self.mu * self.housing[day];
        }

        debug!(days, final_unsheltered = unsheltered[days - 1], "fluid model evaluated");

        FluidTrajectory {
            housed: self.housing.clone(),
            sheltered: self.shelter.clone(),
            unsheltered,
        }
    }

    /// Number unsheltered on a single day
    pub fn evaluate_queue_size(&self, day: usize) -> Option<f64> {
        if day >= self.days() {
            return None;
        }
        let inflow: f64 = self.arrivals[..day].iter().sum();
        let outflow = self.mu * self.housing[..day].iter().sum::<f64>();
        Some(self.initial_demand + inflow - outflow - self.housing[day] - self.shelter[day])
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_sq(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}

impl FluidTrajectory {
    pub fn days(&self) -> usize {
        self.unsheltered.len()
    }

    pub fn mean_unsheltered(&self) -> f64 {
        mean(&self.unsheltered)
    }

    pub fn mean_sheltered(&self) -> f64 {
        mean(&self.sheltered)
    }

    pub fn mean_housed(&self) -> f64 {
        mean(&self.housed)
    }

    pub fn mean_unsheltered_sq(&self) -> f64 {
        mean_sq(&self.unsheltered)
    }

    pub fn mean_sheltered_sq(&self) -> f64 {
        mean_sq(&self.sheltered)
    }

    /// Peak number unsheltered and the day it occurs
    pub fn peak_unsheltered(&self) -> Option<(usize, f64)> {
        self.unsheltered
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}
