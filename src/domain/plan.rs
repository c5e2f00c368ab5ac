use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AccommodationKind, PerKind, ScenarioData};

/// Capacity plan shape errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("{kind} plan has {actual} entries, expected {expected}")]
    PlanLength {
        kind: AccommodationKind,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} capacity in year {year} is invalid: {value}")]
    InvalidCapacity {
        kind: AccommodationKind,
        year: usize,
        value: f64,
    },
    #[error("{kind} plan starts at {actual}, initial capacity is {expected}")]
    InitialMismatch {
        kind: AccommodationKind,
        expected: f64,
        actual: f64,
    },
}

/// Capacity at the end of each year; index 0 is the initial capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityPlan {
    pub housing: Vec<f64>,
    pub shelter: Vec<f64>,
}

/// Tolerance when comparing the first plan entry with the initial capacity
const INITIAL_TOLERANCE: f64 = 1e-6;

impl CapacityPlan {
    pub fn new(housing: Vec<f64>, shelter: Vec<f64>) -> Self {
        Self { housing, shelter }
    }

    /// Plan that keeps the initial capacity for the whole horizon
    pub fn from_initial(data: &ScenarioData) -> Self {
        let years = data.decision_years + 1;
        Self {
            housing: vec![f64::from(data.initial_capacity.housing); years],
            shelter: vec![f64::from(data.initial_capacity.shelter); years],
        }
    }

    pub fn levels(&self, kind: AccommodationKind) -> &[f64] {
        match kind {
            AccommodationKind::Housing => &self.housing,
            AccommodationKind::Shelter => &self.shelter,
        }
    }

    /// Number of annual decisions covered by the plan
    pub fn decision_years(&self) -> usize {
        self.housing.len().saturating_sub(1)
    }

    /// Flatten into `(h_0..h_T, s_0..s_T)`
    pub fn to_vector(&self) -> Vec<f64> {
        self.housing.iter().chain(self.shelter.iter()).copied().collect()
    }

    /// Inverse of [`CapacityPlan::to_vector`]
    pub fn from_vector(x: &[f64]) -> Self {
        let half = x.len() / 2;
        Self {
            housing: x[..half].to_vec(),
            shelter: x[half..].to_vec(),
        }
    }

    pub fn validate(&self, data: &ScenarioData) -> Result<(), PlanError> {
        let expected = data.decision_years + 1;
        let initial = data.initial_capacity.map(f64::from);

        for kind in [AccommodationKind::Housing, AccommodationKind::Shelter] {
            let levels = self.levels(kind);
            if levels.len() != expected {
                return Err(PlanError::PlanLength {
                    kind,
                    expected,
                    actual: levels.len(),
                });
            }
            for (year, &value) in levels.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(PlanError::InvalidCapacity { kind, year, value });
                }
            }
            if (levels[0] - initial[kind]).abs() > INITIAL_TOLERANCE {
                return Err(PlanError::InitialMismatch {
                    kind,
                    expected: initial[kind],
                    actual: levels[0],
                });
            }
        }

        Ok(())
    }

    /// Spend in each year `1..=T` (negative when shelter is decommissioned)
    pub fn annual_costs(&self, costs: &PerKind<f64>) -> Vec<f64> {
        self.housing
            .windows(2)
            .zip(self.shelter.windows(2))
            .map(|(h, s)| costs.housing * (h[1] - h[0]) + costs.shelter * (s[1] - s[0]))
            .collect()
    }

    /// Running total of [`CapacityPlan::annual_costs`]
    pub fn cumulative_costs(&self, costs: &PerKind<f64>) -> Vec<f64> {
        self.annual_costs(costs)
            .into_iter()
            .scan(0.0, |total, c| {
                *total += c;
                Some(*total)
            })
            .collect()
    }

    pub fn total_cost(&self, costs: &PerKind<f64>) -> f64 {
        self.annual_costs(costs).iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scenario::fixtures::small_scenario;

    #[test]
    fn test_from_initial_is_valid() {
        let data = small_scenario();
        let plan = CapacityPlan::from_initial(&data);
        assert_eq!(plan.housing, vec![40.0, 40.0, 40.0]);
        assert_eq!(plan.shelter, vec![20.0, 20.0, 20.0]);
        assert_eq!(plan.decision_years(), 2);
        assert!(plan.validate(&data).is_ok());
    }

    #[test]
    fn test_vector_round_trip() {
        let plan = CapacityPlan::new(vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]);
        let x = plan.to_vector();
        assert_eq!(x, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(CapacityPlan::from_vector(&x), plan);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let data = small_scenario();
        let plan = CapacityPlan::new(vec![40.0, 41.0], vec![20.0, 20.0, 20.0]);
        assert_eq!(
            plan.validate(&data),
            Err(PlanError::PlanLength {
                kind: AccommodationKind::Housing,
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_rejects_initial_mismatch() {
        let data = small_scenario();
        let plan = CapacityPlan::new(vec![40.0, 41.0, 42.0], vec![25.0, 20.0, 20.0]);
        assert!(matches!(
            plan.validate(&data),
            Err(PlanError::InitialMismatch {
                kind: AccommodationKind::Shelter,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_negative_capacity() {
        let data = small_scenario();
        let plan = CapacityPlan::new(vec![40.0, -1.0, 42.0], vec![20.0, 20.0, 20.0]);
        assert!(matches!(
            plan.validate(&data),
            Err(PlanError::InvalidCapacity { year: 1, .. })
        ));
    }

    #[test]
    fn test_costs() {
        let costs = PerKind::new(2.0, 1.0);
        let plan = CapacityPlan::new(vec![10.0, 15.0, 20.0], vec![5.0, 8.0, 6.0]);

        assert_eq!(plan.annual_costs(&costs), vec![13.0, 8.0]);
        assert_eq!(plan.cumulative_costs(&costs), vec![13.0, 21.0]);
        assert_eq!(plan.total_cost(&costs), 21.0);
    }
}
