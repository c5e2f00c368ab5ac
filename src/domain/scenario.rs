use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{PerKind, TriangularParams};
use crate::capacity::DAYS_PER_YEAR;

/// Scenario validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error("Decision horizon must be at least one year")]
    EmptyHorizon,
    #[error("Expected at least {expected} annual arrival rates, got {actual}")]
    ArrivalRatesTooShort { expected: usize, actual: usize },
    #[error("Arrival rate for year {year} is invalid: {rate}")]
    InvalidArrivalRate { year: usize, rate: f64 },
    #[error("Re-entry rate must be within [0, 1], got {0}")]
    InvalidReentryRate(f64),
    #[error("Mean {kind} stay must be finite and non-negative, got {value}")]
    InvalidServiceMean { kind: &'static str, value: f64 },
    #[error("Mean housing stay must be positive for the fluid model")]
    ZeroHousingService,
    #[error("Invalid housing stay distribution: low={low}, mode={mode}, high={high}")]
    InvalidHousingStay { low: f64, mode: f64, high: f64 },
    #[error("Invalid cost for {kind}: {value}")]
    InvalidCost { kind: &'static str, value: f64 },
    #[error("Budget must be finite and non-negative, got {0}")]
    InvalidBudget(f64),
    #[error("Baseline build must be finite and non-negative, got {0}")]
    InvalidBaselineBuild(f64),
}

/// Inputs describing one homeless-care system and its planning horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// Number of annual capacity decisions (years)
    pub decision_years: usize,
    /// Years modelled after the decision horizon, capacity held flat
    #[serde(default)]
    pub extra_years: usize,
    pub initial_capacity: PerKind<u32>,
    /// People in the system at time zero
    pub initial_demand: u32,
    /// Mean length of stay (years)
    pub service_mean: PerKind<f64>,
    /// Housing length of stay used by the simulation (years)
    pub housing_stay: TriangularParams,
    /// Arrivals per year, one entry per modelled year
    pub arrival_rates: Vec<f64>,
    /// Probability of re-entering the system after leaving housing
    #[serde(default)]
    pub reentry_rate: f64,
    #[serde(default)]
    pub budget: f64,
    /// Cost of building one unit
    pub costs: PerKind<f64>,
    /// Minimum annual build per kind
    #[serde(default)]
    pub baseline_build: f64,
}

impl ScenarioData {
    /// Total modelled years (decision horizon plus extra years)
    pub fn modelled_years(&self) -> usize {
        self.decision_years + self.extra_years
    }

    /// Total modelled days
    pub fn modelled_days(&self) -> usize {
        self.modelled_years() * DAYS_PER_YEAR
    }

    /// Arrival rate (per year) in force `years` after arrivals start
    ///
    /// Times past the last configured year use the last rate.
    pub fn arrival_rate_at(&self, years: f64) -> f64 {
        let idx = years.max(0.0).floor() as usize;
        let idx = idx.min(self.arrival_rates.len().saturating_sub(1));
        self.arrival_rates.get(idx).copied().unwrap_or(0.0)
    }

    pub fn max_arrival_rate(&self) -> f64 {
        self.arrival_rates.iter().copied().fold(0.0, f64::max)
    }

    /// People without shelter or housing at time zero (may be negative on over-provision)
    pub fn initial_unsheltered(&self) -> f64 {
        f64::from(self.initial_demand)
            - f64::from(self.initial_capacity.housing)
            - f64::from(self.initial_capacity.shelter)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.decision_years == 0 {
            return Err(ScenarioError::EmptyHorizon);
        }

        let expected = self.modelled_years();
        if self.arrival_rates.len() < expected {
            return Err(ScenarioError::ArrivalRatesTooShort {
                expected,
                actual: self.arrival_rates.len(),
            });
        }

        for (year, &rate) in self.arrival_rates.iter().enumerate() {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ScenarioError::InvalidArrivalRate { year, rate });
            }
        }

        if !(0.0..=1.0).contains(&self.reentry_rate) {
            return Err(ScenarioError::InvalidReentryRate(self.reentry_rate));
        }

        for (kind, value) in [
            ("housing", self.service_mean.housing),
            ("shelter", self.service_mean.shelter),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScenarioError::InvalidServiceMean { kind, value });
            }
        }
        if self.service_mean.housing == 0.0 {
            return Err(ScenarioError::ZeroHousingService);
        }

        let stay = self.housing_stay;
        if !stay.is_valid() {
            return Err(ScenarioError::InvalidHousingStay {
                low: stay.low,
                mode: stay.mode,
                high: stay.high,
            });
        }

        for (kind, value) in [("housing", self.costs.housing), ("shelter", self.costs.shelter)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScenarioError::InvalidCost { kind, value });
            }
        }

        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(ScenarioError::InvalidBudget(self.budget));
        }

        if !self.baseline_build.is_finite() || self.baseline_build < 0.0 {
            return Err(ScenarioError::InvalidBaselineBuild(self.baseline_build));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Small two-year scenario used across unit tests
    pub fn small_scenario() -> ScenarioData {
        ScenarioData {
            decision_years: 2,
            extra_years: 1,
            initial_capacity: PerKind::new(40, 20),
            initial_demand: 100,
            service_mean: PerKind::new(2.0, 0.25),
            housing_stay: TriangularParams::new(1.0, 2.0, 3.0),
            arrival_rates: vec![30.0, 35.0, 40.0],
            reentry_rate: 0.1,
            budget: 60.0,
            costs: PerKind::new(1.0, 0.5),
            baseline_build: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::small_scenario;
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_scenario() {
        assert_eq!(small_scenario().validate(), Ok(()));
    }

    #[test]
    fn test_modelled_days() {
        let data = small_scenario();
        assert_eq!(data.modelled_years(), 3);
        assert_eq!(data.modelled_days(), 3 * 365);
    }

    #[test]
    fn test_initial_unsheltered() {
        assert_eq!(small_scenario().initial_unsheltered(), 40.0);
    }

    #[rstest]
    #[case(0.0, 30.0)]
    #[case(0.99, 30.0)]
    #[case(1.0, 35.0)]
    #[case(2.5, 40.0)]
    #[case(7.0, 40.0)]
    fn test_arrival_rate_at(#[case] years: f64, #[case] expected: f64) {
        assert_eq!(small_scenario().arrival_rate_at(years), expected);
    }

    #[test]
    fn test_rejects_short_arrival_rates() {
        let mut data = small_scenario();
        data.arrival_rates.pop();
        assert_eq!(
            data.validate(),
            Err(ScenarioError::ArrivalRatesTooShort { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_rejects_empty_horizon() {
        let mut data = small_scenario();
        data.decision_years = 0;
        assert_eq!(data.validate(), Err(ScenarioError::EmptyHorizon));
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.5)]
    fn test_rejects_bad_reentry(#[case] rate: f64) {
        let mut data = small_scenario();
        data.reentry_rate = rate;
        assert_eq!(data.validate(), Err(ScenarioError::InvalidReentryRate(rate)));
    }

    #[test]
    fn test_rejects_zero_housing_service() {
        let mut data = small_scenario();
        data.service_mean.housing = 0.0;
        assert_eq!(data.validate(), Err(ScenarioError::ZeroHousingService));
    }

    #[test]
    fn test_zero_shelter_stay_is_allowed() {
        let mut data = small_scenario();
        data.service_mean.shelter = 0.0;
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_rate() {
        let mut data = small_scenario();
        data.arrival_rates[1] = -3.0;
        assert_eq!(
            data.validate(),
            Err(ScenarioError::InvalidArrivalRate { year: 1, rate: -3.0 })
        );
    }

    #[test]
    fn test_rejects_bad_stay_distribution() {
        let mut data = small_scenario();
        data.housing_stay = TriangularParams::new(3.0, 2.0, 1.0);
        assert!(matches!(
            data.validate(),
            Err(ScenarioError::InvalidHousingStay { .. })
        ));
    }
}
