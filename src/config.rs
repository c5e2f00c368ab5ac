use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use validator::Validate;

use crate::domain::ScenarioData;
use crate::optimizer::{FrankWolfeStrategy, ProblemKind};
use crate::simulation::SimulationSettings;

const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scenario: ScenarioData,
    pub planning: PlanningConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlanningConfig {
    #[serde(flatten)]
    pub problem: ProblemKind,
    /// Weight `c` of the shelter term
    #[validate(range(min = 0.0))]
    pub shelter_weight: f64,
    #[serde(default = "default_tolerance")]
    #[validate(range(min = 0.0))]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1))]
    pub max_iterations: usize,
}

fn default_tolerance() -> f64 {
    FrankWolfeStrategy::default().tolerance
}

fn default_max_iterations() -> usize {
    FrankWolfeStrategy::default().max_iterations
}

impl PlanningConfig {
    pub fn frank_wolfe(&self) -> FrankWolfeStrategy {
        FrankWolfeStrategy::new(self.tolerance, self.max_iterations)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output/numerical_results.json"),
        }
    }
}

impl Config {
    /// Load `config/default.toml` (or `TVCP_CONFIG`) overlaid with `TVCP__*` variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let file = std::env::var("TVCP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&file))
                .merge(Env::prefixed("TVCP__").split("__")),
        )
        .with_context(|| format!("loading configuration from {file}"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Self = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.scenario.validate().context("invalid [scenario]")?;
        Validate::validate(&self.planning).context("invalid [planning]")?;
        Validate::validate(&self.simulation).context("invalid [simulation]")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = r#"
        [scenario]
        decision_years = 2
        extra_years = 1
        initial_capacity = { housing = 40, shelter = 20 }
        initial_demand = 100
        service_mean = { housing = 2.0, shelter = 0.25 }
        housing_stay = { low = 1.0, mode = 2.0, high = 3.0 }
        arrival_rates = [30.0, 35.0, 40.0]
        reentry_rate = 0.1
        budget = 60.0
        costs = { housing = 1.0, shelter = 0.5 }

        [planning]
        problem = "phi2"
        shelter_mode = 1
        shelter_weight = 0.2

        [simulation]
        replications = 5
        warm_up_years = 0.5
        build_interval_days = 1.0
        seed = 9
        percentile = 90.0

        [output]
        path = "out/results.json"
    "#;

    #[test]
    fn test_load_sample() {
        let cfg = Config::from_figment(Figment::new().merge(Toml::string(SAMPLE))).unwrap();

        assert_eq!(cfg.planning.problem, ProblemKind::Phi2 { shelter_mode: 1 });
        assert_eq!(cfg.planning.max_iterations, FrankWolfeStrategy::default().max_iterations);
        assert_eq!(cfg.scenario.baseline_build, 0.0);
        assert_eq!(cfg.simulation.replications, 5);
        assert!(cfg.simulation.enabled);
        assert_eq!(cfg.output.path, PathBuf::from("out/results.json"));
    }

    #[test]
    fn test_invalid_scenario_is_rejected() {
        let broken = SAMPLE.replace("reentry_rate = 0.1", "reentry_rate = 1.5");
        let err = Config::from_figment(Figment::new().merge(Toml::string(&broken))).unwrap_err();
        assert!(format!("{err:#}").contains("Re-entry rate"));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let broken = SAMPLE.replace("shelter_weight = 0.2", "shelter_weight = -1.0");
        assert!(Config::from_figment(Figment::new().merge(Toml::string(&broken))).is_err());
    }

    #[rstest]
    #[case("percentile = 50.0")]
    #[case("percentile = 100.5")]
    fn test_out_of_range_percentile_is_rejected(#[case] line: &str) {
        let broken = SAMPLE.replace("percentile = 90.0", line);
        let err = Config::from_figment(Figment::new().merge(Toml::string(&broken))).unwrap_err();
        assert!(format!("{err:#}").contains("[simulation]"));
    }

    #[test]
    fn test_simulation_defaults_when_section_missing() {
        let start = SAMPLE.find("[simulation]").unwrap();
        let end = SAMPLE.find("[output]").unwrap();
        let trimmed = format!("{}{}", &SAMPLE[..start], &SAMPLE[end..]);
        let cfg = Config::from_figment(Figment::new().merge(Toml::string(&trimmed))).unwrap();
        assert_eq!(cfg.simulation.replications, SimulationSettings::default().replications);
    }
}
