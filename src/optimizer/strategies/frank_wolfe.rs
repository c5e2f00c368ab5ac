//! Frank-Wolfe (conditional gradient) strategy
//!
//! The quadratic objectives are convex over a polytope, so each iteration
//! solves an LP with the current gradient as cost, then moves toward that
//! vertex with an exact line search. The duality gap `g'(x - y)` bounds the
//! distance to the optimum and is the stopping test.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::minimise_linear;
use crate::domain::CapacityPlan;
use crate::optimizer::{PlanningError, PlanningOutcome, PlanningProblem, PlanningStrategy};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrankWolfeStrategy {
    /// Stop once the duality gap is below `tolerance * max(1, |f(x)|)`
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for FrankWolfeStrategy {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 500,
        }
    }
}

impl FrankWolfeStrategy {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

impl PlanningStrategy for FrankWolfeStrategy {
    fn name(&self) -> &'static str {
        "frank-wolfe"
    }

    fn solve_until_cancelled(
        &self,
        problem: &PlanningProblem,
        cancel: &CancellationToken,
    ) -> Result<PlanningOutcome, PlanningError> {
        let objective = &problem.objective;

        // start from the LP vertex that is best for the gradient at "build nothing"
        let idle = DVector::from_vec(CapacityPlan::from_initial(&problem.data).to_vector());
        let mut x = minimise_linear(&objective.gradient(&idle), &problem.constraints)?;

        let mut gap = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            if cancel.is_cancelled() {
                return Err(PlanningError::Cancelled);
            }
            iterations += 1;

            let grad = objective.gradient(&x);
            let vertex = minimise_linear(&grad, &problem.constraints)?;
            let direction = &vertex - &x;
            gap = -grad.dot(&direction);

            let value = objective.value(&x);
            if gap <= self.tolerance * value.abs().max(1.0) {
                converged = true;
                break;
            }

            let curvature = objective.curvature(&direction);
            let step = if curvature > 0.0 {
                (gap / (2.0 * curvature)).clamp(0.0, 1.0)
            } else {
                1.0
            };
            x += direction * step;

            debug!(iterations, value, gap, step, "frank-wolfe step");
        }

        if !converged {
            warn!(
                iterations,
                gap, "frank-wolfe stopped at the iteration cap before reaching tolerance"
            );
        }

        let plan = problem.to_plan(&x);
        let objective_value = objective.value(&DVector::from_vec(plan.to_vector()));

        Ok(PlanningOutcome {
            problem: problem.kind,
            strategy: self.name().to_string(),
            annual_costs: plan.annual_costs(&problem.data.costs),
            plan,
            objective_value,
            iterations,
            duality_gap: gap.max(0.0),
            converged,
        })
    }
}
