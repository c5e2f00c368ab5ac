//! # Fluid Flow Model
//!
//! Deterministic continuous approximation of the care system. Given a capacity
//! plan it produces the expected number of people housed, sheltered and
//! unsheltered on every modelled day.
//!
//! ## Components
//!
//! - **FluidFlowModel**: daily flow balance for one plan
//! - **AffineFluidModel**: the same model as an affine map of the plan, used by the optimizer
//! - **Objective**: linear and quadratic scores of a trajectory

pub mod affine;
pub mod model;
pub mod objective;

pub use affine::{AffineFluidModel, LinearForm, QuadraticForm};
pub use model::{FluidFlowModel, FluidTrajectory};
pub use objective::Objective;
