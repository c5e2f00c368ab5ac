use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{PlanningError, ProblemKind};
use crate::domain::ScenarioData;

/// Feasibility tolerance used when checking a candidate plan
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Eq,
}

/// `Σ coeff * x[index]  (<= | >= | ==)  rhs` over the decision vector
/// `x = (h_0..h_T, s_0..s_T)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Merge repeated indices and drop zero coefficients
    pub fn new(
        name: impl Into<String>,
        terms: impl IntoIterator<Item = (usize, f64)>,
        relation: Relation,
        rhs: f64,
    ) -> Self {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (idx, coeff) in terms {
            *merged.entry(idx).or_insert(0.0) += coeff;
        }
        Self {
            name: name.into(),
            terms: merged.into_iter().filter(|(_, c)| *c != 0.0).collect(),
            relation,
            rhs,
        }
    }

    pub fn lhs(&self, x: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, c)| c * x[i]).sum()
    }

    pub fn is_satisfied(&self, x: &[f64]) -> bool {
        let lhs = self.lhs(x);
        let tol = FEASIBILITY_TOLERANCE * self.rhs.abs().max(1.0);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + tol,
            Relation::GreaterEq => lhs >= self.rhs - tol,
            Relation::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

/// Index helper for the decision vector
#[derive(Debug, Clone, Copy)]
struct Layout {
    years: usize,
}

impl Layout {
    fn h(&self, t: usize) -> usize {
        t
    }

    fn s(&self, t: usize) -> usize {
        self.years + 1 + t
    }
}

/// Build the constraint set of a planning problem
pub fn build_constraints(
    data: &ScenarioData,
    kind: &ProblemKind,
) -> Result<Vec<LinearConstraint>, PlanningError> {
    let years = data.decision_years;
    let at = Layout { years };
    let costs = data.costs;
    let mut out = Vec::new();

    // initial conditions
    out.push(LinearConstraint::new(
        "init_h",
        [(at.h(0), 1.0)],
        Relation::Eq,
        f64::from(data.initial_capacity.housing),
    ));
    out.push(LinearConstraint::new(
        "init_s",
        [(at.s(0), 1.0)],
        Relation::Eq,
        f64::from(data.initial_capacity.shelter),
    ));

    // spend from the start of the horizon up to the end of year t
    let spend_until = |t: usize| {
        (1..=t).flat_map(move |k| {
            [
                (at.h(k), costs.housing),
                (at.h(k - 1), -costs.housing),
                (at.s(k), costs.shelter),
                (at.s(k - 1), -costs.shelter),
            ]
        })
    };

    match *kind {
        ProblemKind::Phi0 | ProblemKind::Phi1 => {
            out.push(LinearConstraint::new(
                "budget",
                spend_until(years),
                Relation::LessEq,
                data.budget,
            ));
            for t in 1..=years {
                out.push(LinearConstraint::new(
                    format!("h_base[{t}]"),
                    [(at.h(t), 1.0), (at.h(t - 1), -1.0)],
                    Relation::GreaterEq,
                    data.baseline_build,
                ));
                out.push(LinearConstraint::new(
                    format!("s_base[{t}]"),
                    [(at.s(t), 1.0), (at.s(t - 1), -1.0)],
                    Relation::GreaterEq,
                    data.baseline_build,
                ));
            }
        }
        ProblemKind::Phi2 { shelter_mode } => {
            if shelter_mode == 0 || shelter_mode > years {
                return Err(PlanningError::InvalidShelterMode {
                    mode: shelter_mode,
                    years,
                });
            }

            for t in 1..=years {
                out.push(LinearConstraint::new(
                    format!("budget_annual[{t}]"),
                    spend_until(t),
                    Relation::LessEq,
                    data.budget,
                ));
                out.push(LinearConstraint::new(
                    format!("h_increase[{t}]"),
                    [(at.h(t), 1.0), (at.h(t - 1), -1.0)],
                    Relation::GreaterEq,
                    0.0,
                ));
            }

            // build rate never slows: h_t - h_{t-1} >= h_{t-1} - h_{t-2}
            for t in 2..=years {
                out.push(LinearConstraint::new(
                    format!("h_rate_increase[{t}]"),
                    [(at.h(t), 1.0), (at.h(t - 1), -2.0), (at.h(t - 2), 1.0)],
                    Relation::GreaterEq,
                    0.0,
                ));
            }

            for t in 1..=shelter_mode {
                out.push(LinearConstraint::new(
                    format!("s_increase[{t}]"),
                    [(at.s(t), 1.0), (at.s(t - 1), -1.0)],
                    Relation::GreaterEq,
                    0.0,
                ));
            }
            for t in shelter_mode + 1..=years {
                out.push(LinearConstraint::new(
                    format!("s_decrease[{t}]"),
                    [(at.s(t), 1.0), (at.s(t - 1), -1.0)],
                    Relation::LessEq,
                    0.0,
                ));
                out.push(LinearConstraint::new(
                    format!("s_not_too_low[{t}]"),
                    [(at.s(t), 1.0), (at.s(0), -1.0)],
                    Relation::GreaterEq,
                    0.0,
                ));
            }
        }
    }

    Ok(out)
}

/// Names of the constraints a candidate violates
pub fn violations<'a>(constraints: &'a [LinearConstraint], x: &[f64]) -> Vec<&'a str> {
    let mut names: Vec<&str> = constraints
        .iter()
        .filter(|c| !c.is_satisfied(x))
        .map(|c| c.name.as_str())
        .collect();
    if x.iter().any(|&v| v < -FEASIBILITY_TOLERANCE) {
        names.push("non_negative");
    }
    names
}
