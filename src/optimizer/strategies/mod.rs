//! Planning Strategies
//!
//! This module contains the solution strategies for capacity planning problems:
//! - LP: exact linear programming for linear objectives
//! - Frank-Wolfe: conditional gradient for the convex quadratic objectives

pub mod frank_wolfe;
pub mod lp;

pub use frank_wolfe::*;
pub use lp::*;
