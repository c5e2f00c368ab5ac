//! Time-varying capacity planning for housing and shelter
//!
//! A fluid approximation of the care system turns a capacity plan into
//! expected daily occupancy; the optimizer picks the plan that minimises
//! unsheltered (and sheltered) numbers within budget; a discrete-event
//! simulation then checks the chosen plan under randomness.

pub mod capacity;
pub mod config;
pub mod domain;
pub mod fluid;
pub mod optimizer;
pub mod pipeline;
pub mod report;
pub mod simulation;
pub mod telemetry;
