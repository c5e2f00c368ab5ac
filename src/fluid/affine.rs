//! Affine form of the fluid model
//!
//! Daily capacity is linear in the annual levels and the fluid balance is
//! linear in daily capacity, so for the decision vector
//! `x = (h_0..h_T, s_0..s_T)` every trajectory is `u = A_u x + b_u`,
//! `s = A_s x + b_s`. The planner works on this form instead of re-running the
//! model for every candidate.

use nalgebra::{DMatrix, DVector};

use super::FluidFlowModel;
use crate::domain::{CapacityPlan, PlanError, ScenarioData};

#[derive(Debug, Clone)]
pub struct AffineFluidModel {
    u_coeffs: DMatrix<f64>,
    u_offset: DVector<f64>,
    s_coeffs: DMatrix<f64>,
    s_offset: DVector<f64>,
}

/// `f(x) = x' Q x + 2 q' x + r`
#[derive(Debug, Clone)]
pub struct QuadraticForm {
    pub q_mat: DMatrix<f64>,
    pub q_vec: DVector<f64>,
    pub r: f64,
}

/// `f(x) = c' x + k`
#[derive(Debug, Clone)]
pub struct LinearForm {
    pub coeffs: DVector<f64>,
    pub constant: f64,
}

impl AffineFluidModel {
    /// Evaluate the fluid model at the origin and at each unit vector
    pub fn build(data: &ScenarioData) -> Result<Self, PlanError> {
        let n = 2 * (data.decision_years + 1);
        let evaluate = |x: &[f64]| -> Result<_, PlanError> {
            Ok(FluidFlowModel::from_plan(data, &CapacityPlan::from_vector(x))?.analyse())
        };

        let mut x = vec![0.0; n];
        let base = evaluate(&x)?;
        let days = base.days();

        let mut u_coeffs = DMatrix::zeros(days, n);
        let mut s_coeffs = DMatrix::zeros(days, n);
        for i in 0..n {
            x[i] = 1.0;
            let unit = evaluate(&x)?;
            x[i] = 0.0;

            for d in 0..days {
                u_coeffs[(d, i)] = unit.unsheltered[d] - base.unsheltered[d];
                s_coeffs[(d, i)] = unit.sheltered[d] - base.sheltered[d];
            }
        }

        Ok(Self {
            u_coeffs,
            u_offset: DVector::from_vec(base.unsheltered),
            s_coeffs,
            s_offset: DVector::from_vec(base.sheltered),
        })
    }

    pub fn dimension(&self) -> usize {
        self.u_coeffs.ncols()
    }

    pub fn days(&self) -> usize {
        self.u_coeffs.nrows()
    }

    pub fn unsheltered(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.u_coeffs * x + &self.u_offset
    }

    pub fn sheltered(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.s_coeffs * x + &self.s_offset
    }

    /// `mean(u) + c * mean(s)` as a linear function of `x`
    pub fn linear_objective(&self, shelter_weight: f64) -> LinearForm {
        let n_days = self.days() as f64;
        let ones = DVector::from_element(self.days(), 1.0);
        let coeffs = (self.u_coeffs.tr_mul(&ones) + self.s_coeffs.tr_mul(&ones) * shelter_weight)
            / n_days;
        let constant = (self.u_offset.sum() + shelter_weight * self.s_offset.sum()) / n_days;
        LinearForm { coeffs, constant }
    }

    /// `mean(u^2) + c * mean(s^2)` as a quadratic function of `x`
    pub fn quadratic_objective(&self, shelter_weight: f64) -> QuadraticForm {
        let n_days = self.days() as f64;
        let q_mat = (self.u_coeffs.tr_mul(&self.u_coeffs)
            + self.s_coeffs.tr_mul(&self.s_coeffs) * shelter_weight)
            / n_days;
        let q_vec = (self.u_coeffs.tr_mul(&self.u_offset)
            + self.s_coeffs.tr_mul(&self.s_offset) * shelter_weight)
            / n_days;
        let r = (self.u_offset.norm_squared() + shelter_weight * self.s_offset.norm_squared())
            / n_days;
        QuadraticForm { q_mat, q_vec, r }
    }
}

impl LinearForm {
    pub fn value(&self, x: &DVector<f64>) -> f64 {
        self.coeffs.dot(x) + self.constant
    }
}

impl QuadraticForm {
    pub fn value(&self, x: &DVector<f64>) -> f64 {
        x.dot(&(&self.q_mat * x)) + 2.0 * self.q_vec.dot(x) + self.r
    }

    pub fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        (&self.q_mat * x + &self.q_vec) * 2.0
    }

    /// Curvature `d' Q d` along a direction
    pub fn curvature(&self, d: &DVector<f64>) -> f64 {
        d.dot(&(&self.q_mat * d))
    }
}
