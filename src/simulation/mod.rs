//! # Care System Simulation
//!
//! Discrete-event simulation of people moving through shelter and housing
//! while the stock of units is built or demolished to follow a capacity plan.
//!
//! ## Components
//!
//! - **Calendar**: future event list ordered by time, FIFO on ties
//! - **Stock**: free units and FIFO waiting lists per accommodation kind
//! - **Environment**: one replication driving arrivals, stays and development
//! - **Model**: independent seeded replications summarised as a fan chart
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tvcp::simulation::{SimulationModel, SimulationSettings};
//!
//! let model = SimulationModel::new(&scenario, &SimulationSettings::default(), &plan)?;
//! let report = model.analyse(90.0)?;
//! println!("mean unsheltered: {}", report.mean_average_unsheltered);
//! ```

pub mod calendar;
pub mod customer;
pub mod environment;
pub mod model;
pub mod stock;

pub use calendar::Calendar;
pub use customer::Customer;
pub use environment::{Replication, ReplicationResult};
pub use model::{
    linear_percentile, FanChart, SimulationError, SimulationModel, SimulationReport,
    SimulationSettings,
};
pub use stock::{AccommodationStock, Claim, Demolition, Handover, QueueStats};
