use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tvcp::{config, pipeline, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let output = cfg.output.path.clone();

    info!(
        problem = cfg.planning.problem.name(),
        decision_years = cfg.scenario.decision_years,
        replications = cfg.simulation.replications,
        "starting capacity planning run"
    );

    let cancel = CancellationToken::new();
    let mut run = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        move || pipeline::run(&cfg, &cancel)
    });

    let results = tokio::select! {
        joined = &mut run => joined??,
        _ = telemetry::shutdown_signal() => {
            cancel.cancel();
            // the blocking task returns at its next cancellation check
            if let Err(e) = run.await? {
                warn!(error = %format!("{e:#}"), "run cancelled; no results written");
            }
            return Ok(());
        }
    };

    results.write_json(&output)?;

    info!(run_id = %results.run_id, "run complete");
    Ok(())
}
