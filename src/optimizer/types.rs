use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{build_constraints, LinearConstraint};
use crate::domain::{CapacityPlan, PlanError, ScenarioData, ScenarioError};
use crate::fluid::{AffineFluidModel, LinearForm, Objective, QuadraticForm};

/// Capacity planning errors
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Invalid scenario: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("Invalid plan: {0}")]
    Plan(#[from] PlanError),
    #[error("Shelter mode {mode} must be within 1..={years}")]
    InvalidShelterMode { mode: usize, years: usize },
    #[error("Shelter weight must be finite and non-negative, got {0}")]
    InvalidWeight(f64),
    #[error("Constraints are infeasible")]
    Infeasible,
    #[error("Problem is unbounded (check accommodation costs)")]
    Unbounded,
    #[error("Solver failed: {0}")]
    Solver(String),
    #[error("Planning cancelled")]
    Cancelled,
    #[error("Strategy {strategy} cannot minimise a {objective} objective")]
    UnsupportedObjective {
        strategy: &'static str,
        objective: Objective,
    },
}

/// Which planning problem to solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "lowercase")]
pub enum ProblemKind {
    /// Linear objective, total budget, minimum annual build
    Phi0,
    /// Quadratic objective, total budget, minimum annual build
    Phi1,
    /// Quadratic objective, budget checked every year, shaped capacity paths
    Phi2 { shelter_mode: usize },
}

impl ProblemKind {
    pub fn objective(&self) -> Objective {
        match self {
            ProblemKind::Phi0 => Objective::Linear,
            ProblemKind::Phi1 | ProblemKind::Phi2 { .. } => Objective::Quadratic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProblemKind::Phi0 => "phi0",
            ProblemKind::Phi1 => "phi1",
            ProblemKind::Phi2 { .. } => "phi2",
        }
    }
}

/// Objective of a problem in the form the strategies work with
#[derive(Debug, Clone)]
pub enum ObjectiveForm {
    Linear(LinearForm),
    Quadratic(QuadraticForm),
}

impl ObjectiveForm {
    pub fn value(&self, x: &DVector<f64>) -> f64 {
        match self {
            ObjectiveForm::Linear(f) => f.value(x),
            ObjectiveForm::Quadratic(f) => f.value(x),
        }
    }

    pub fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        match self {
            ObjectiveForm::Linear(f) => f.coeffs.clone(),
            ObjectiveForm::Quadratic(f) => f.gradient(x),
        }
    }

    pub fn curvature(&self, d: &DVector<f64>) -> f64 {
        match self {
            ObjectiveForm::Linear(_) => 0.0,
            ObjectiveForm::Quadratic(f) => f.curvature(d),
        }
    }
}

/// A capacity planning problem over the annual housing and shelter levels
#[derive(Debug, Clone)]
pub struct PlanningProblem {
    pub data: ScenarioData,
    pub kind: ProblemKind,
    /// Weight `c` of the sheltered term
    pub shelter_weight: f64,
    pub constraints: Vec<LinearConstraint>,
    pub objective: ObjectiveForm,
}

impl PlanningProblem {
    pub fn new(
        data: ScenarioData,
        kind: ProblemKind,
        shelter_weight: f64,
    ) -> Result<Self, PlanningError> {
        data.validate()?;
        if !shelter_weight.is_finite() || shelter_weight < 0.0 {
            return Err(PlanningError::InvalidWeight(shelter_weight));
        }

        let constraints = build_constraints(&data, &kind)?;
        let affine = AffineFluidModel::build(&data)?;
        let objective = match kind.objective() {
            Objective::Linear => ObjectiveForm::Linear(affine.linear_objective(shelter_weight)),
            Objective::Quadratic => {
                ObjectiveForm::Quadratic(affine.quadratic_objective(shelter_weight))
            }
        };

        Ok(Self {
            data,
            kind,
            shelter_weight,
            constraints,
            objective,
        })
    }

    /// Length of the decision vector
    pub fn dimension(&self) -> usize {
        2 * (self.data.decision_years + 1)
    }

    /// Snap a solver vector onto a valid plan (clears round-off below zero
    /// and pins year 0 to the initial capacity)
    pub fn to_plan(&self, x: &DVector<f64>) -> CapacityPlan {
        let mut plan = CapacityPlan::from_vector(x.as_slice());
        for v in plan.housing.iter_mut().chain(plan.shelter.iter_mut()) {
            *v = v.max(0.0);
        }
        plan.housing[0] = f64::from(self.data.initial_capacity.housing);
        plan.shelter[0] = f64::from(self.data.initial_capacity.shelter);
        plan
    }
}

/// Result of solving a planning problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningOutcome {
    pub problem: ProblemKind,
    pub strategy: String,
    pub plan: CapacityPlan,
    pub objective_value: f64,
    pub iterations: usize,
    /// Frank-Wolfe duality gap at the returned plan (0 for an exact LP)
    pub duality_gap: f64,
    pub converged: bool,
    pub annual_costs: Vec<f64>,
}

impl PlanningOutcome {
    pub fn log_summary(&self) {
        let round = |v: &[f64]| -> Vec<f64> {
            v.iter().skip(1).map(|x| (x * 100.0).round() / 100.0).collect()
        };
        info!(
            problem = self.problem.name(),
            strategy = %self.strategy,
            housing = ?round(&self.plan.housing),
            shelter = ?round(&self.plan.shelter),
            objective = (self.objective_value * 100.0).round() / 100.0,
            iterations = self.iterations,
            "optimal capacity plan"
        );
    }
}

pub trait PlanningStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve, returning [`PlanningError::Cancelled`] once `cancel` fires
    fn solve_until_cancelled(
        &self,
        problem: &PlanningProblem,
        cancel: &CancellationToken,
    ) -> Result<PlanningOutcome, PlanningError>;

    fn solve(&self, problem: &PlanningProblem) -> Result<PlanningOutcome, PlanningError> {
        self.solve_until_cancelled(problem, &CancellationToken::new())
    }
}

pub struct CapacityPlanner {
    pub strategy: Box<dyn PlanningStrategy>,
    cancel: CancellationToken,
}

impl CapacityPlanner {
    pub fn new(strategy: Box<dyn PlanningStrategy>) -> Self {
        Self {
            strategy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn plan(&self, problem: &PlanningProblem) -> Result<PlanningOutcome, PlanningError> {
        info!(
            problem = problem.kind.name(),
            strategy = self.strategy.name(),
            years = problem.data.decision_years,
            constraints = problem.constraints.len(),
            "solving capacity planning problem"
        );
        let outcome = self.strategy.solve_until_cancelled(problem, &self.cancel)?;
        outcome.log_summary();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scenario::fixtures::small_scenario;

    #[test]
    fn test_problem_objectives() {
        assert_eq!(ProblemKind::Phi0.objective(), Objective::Linear);
        assert_eq!(ProblemKind::Phi1.objective(), Objective::Quadratic);
        assert_eq!(
            ProblemKind::Phi2 { shelter_mode: 1 }.objective(),
            Objective::Quadratic
        );
    }

    #[test]
    fn test_problem_kind_serde() {
        let kind: ProblemKind =
            serde_json::from_str(r#"{"problem":"phi2","shelter_mode":3}"#).unwrap();
        assert_eq!(kind, ProblemKind::Phi2 { shelter_mode: 3 });
        assert_eq!(
            serde_json::to_string(&ProblemKind::Phi0).unwrap(),
            r#"{"problem":"phi0"}"#
        );
    }

    #[test]
    fn test_rejects_negative_weight() {
        assert!(matches!(
            PlanningProblem::new(small_scenario(), ProblemKind::Phi0, -1.0),
            Err(PlanningError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_scenario() {
        let mut data = small_scenario();
        data.decision_years = 0;
        assert!(matches!(
            PlanningProblem::new(data, ProblemKind::Phi0, 1.0),
            Err(PlanningError::Scenario(ScenarioError::EmptyHorizon))
        ));
    }

    #[test]
    fn test_to_plan_pins_initial_capacity() {
        let problem = PlanningProblem::new(small_scenario(), ProblemKind::Phi1, 1.0).unwrap();
        let x = DVector::from_vec(vec![40.000001, 50.0, -1e-12, 19.9999999, 25.0, 30.0]);
        let plan = problem.to_plan(&x);
        assert_eq!(plan.housing, vec![40.0, 50.0, 0.0]);
        assert_eq!(plan.shelter, vec![20.0, 25.0, 30.0]);
    }

    #[test]
    fn test_cancelled_planner_stops() {
        let problem = PlanningProblem::new(small_scenario(), ProblemKind::Phi1, 1.0).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let planner = CapacityPlanner::new(Box::new(crate::optimizer::FrankWolfeStrategy::default()))
            .with_cancellation(cancel);
        assert!(matches!(planner.plan(&problem), Err(PlanningError::Cancelled)));
    }

    #[test]
    fn test_linear_form_has_zero_curvature() {
        let problem = PlanningProblem::new(small_scenario(), ProblemKind::Phi0, 1.0).unwrap();
        let d = DVector::from_element(problem.dimension(), 1.0);
        assert_eq!(problem.objective.curvature(&d), 0.0);
    }
}
