//! Linear programming strategy
//!
//! Solves problems with a linear objective exactly. The same routine is the
//! linear minimisation oracle behind the Frank-Wolfe strategy.
//!
//! The LP is built with `good_lp` and handed to the pure-Rust `minilp`
//! backend, so no native solver library is needed.

use good_lp::solvers::minilp::minilp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use nalgebra::DVector;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fluid::Objective;
use crate::optimizer::{
    violations, LinearConstraint, ObjectiveForm, PlanningError, PlanningOutcome,
    PlanningProblem, PlanningStrategy, Relation,
};

/// Minimise `c' x` subject to the constraints and `x >= 0`
pub fn minimise_linear(
    cost: &DVector<f64>,
    constraints: &[LinearConstraint],
) -> Result<DVector<f64>, PlanningError> {
    let mut problem = ProblemVariables::new();
    let x: Vec<Variable> = problem.add_vector(variable().min(0.0), cost.len());

    let objective: Expression = x.iter().zip(cost.iter()).map(|(&v, &c)| c * v).sum();
    let mut model = problem.minimise(objective).using(minilp);

    for c in constraints {
        let lhs: Expression = c.terms.iter().map(|&(i, coeff)| coeff * x[i]).sum();
        let rhs = c.rhs;
        model = match c.relation {
            Relation::LessEq => model.with(constraint!(lhs <= rhs)),
            Relation::GreaterEq => model.with(constraint!(lhs >= rhs)),
            Relation::Eq => model.with(constraint!(lhs == rhs)),
        };
    }

    let solution = model.solve().map_err(|e| match e {
        ResolutionError::Infeasible => PlanningError::Infeasible,
        ResolutionError::Unbounded => PlanningError::Unbounded,
        other => PlanningError::Solver(other.to_string()),
    })?;

    Ok(DVector::from_iterator(
        x.len(),
        x.iter().map(|&v| solution.value(v)),
    ))
}

/// Exact solution for linear objectives
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearProgramStrategy;

impl PlanningStrategy for LinearProgramStrategy {
    fn name(&self) -> &'static str {
        "linear-program"
    }

    fn solve_until_cancelled(
        &self,
        problem: &PlanningProblem,
        cancel: &CancellationToken,
    ) -> Result<PlanningOutcome, PlanningError> {
        if cancel.is_cancelled() {
            return Err(PlanningError::Cancelled);
        }
        let ObjectiveForm::Linear(form) = &problem.objective else {
            return Err(PlanningError::UnsupportedObjective {
                strategy: self.name(),
                objective: Objective::Quadratic,
            });
        };

        let x = minimise_linear(&form.coeffs, &problem.constraints)?;
        let broken = violations(&problem.constraints, x.as_slice());
        if !broken.is_empty() {
            debug!(?broken, "solver returned a point outside tolerance");
        }

        let plan = problem.to_plan(&x);
        let objective_value = problem.objective.value(&DVector::from_vec(plan.to_vector()));

        Ok(PlanningOutcome {
            problem: problem.kind,
            strategy: self.name().to_string(),
            annual_costs: plan.annual_costs(&problem.data.costs),
            plan,
            objective_value,
            iterations: 1,
            duality_gap: 0.0,
            converged: true,
        })
    }
}
