//! Plan, score and simulate one configured scenario

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::fluid::FluidFlowModel;
use crate::optimizer::{strategy_for, CapacityPlanner, PlanningProblem};
use crate::report::{FluidSummary, NumericalResults};
use crate::simulation::SimulationModel;

/// Runs to completion unless `cancel` fires, checked between solver
/// iterations and between replications
pub fn run(cfg: &Config, cancel: &CancellationToken) -> Result<NumericalResults> {
    let scenario = &cfg.scenario;
    let planning = &cfg.planning;

    if scenario.initial_unsheltered() < 0.0 {
        warn!(
            initial_demand = scenario.initial_demand,
            "initial capacity exceeds initial demand"
        );
    }

    let problem = PlanningProblem::new(scenario.clone(), planning.problem, planning.shelter_weight)
        .context("building planning problem")?;
    let planner = CapacityPlanner::new(strategy_for(&planning.problem, planning.frank_wolfe()))
        .with_cancellation(cancel.clone());
    let outcome = planner.plan(&problem).context("solving planning problem")?;

    let trajectory = FluidFlowModel::new(scenario, &outcome.plan)
        .context("evaluating plan with the fluid model")?
        .analyse();
    let fluid = FluidSummary::new(
        trajectory,
        planning.problem.objective(),
        planning.shelter_weight,
    );
    info!(
        mean_unsheltered = (fluid.mean_unsheltered * 100.0).round() / 100.0,
        mean_sheltered = (fluid.mean_sheltered * 100.0).round() / 100.0,
        "fluid model evaluated"
    );

    let simulation = if cfg.simulation.enabled {
        let model = SimulationModel::new(scenario, &cfg.simulation, &outcome.plan)
            .context("setting up simulation")?
            .with_cancellation(cancel.clone());
        Some(
            model
                .analyse(cfg.simulation.percentile)
                .context("running simulation")?,
        )
    } else {
        info!("simulation disabled");
        None
    };

    Ok(NumericalResults::new(
        scenario.clone(),
        outcome,
        fluid,
        simulation,
    ))
}
