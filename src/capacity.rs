//! Daily capacity profiles
//!
//! Capacity decisions are annual, but both the fluid model and the simulation
//! step in days. Within a decision year the capacity moves linearly from the
//! level at the start of the year to the level at its end; after the decision
//! horizon it stays at the final level.

use itertools::Itertools;

use crate::domain::{AccommodationKind, CapacityPlan, PerKind, PlanError};

pub const DAYS_PER_YEAR: usize = 365;

/// Expand annual capacity levels into one level per day
///
/// `annual[0]` is the initial capacity and `annual[y]` the capacity at the end
/// of year `y`. The result covers days `0..=(decision_years + extra_years) * 365`,
/// so day 0 is the initial capacity and the last entry is the final level.
pub fn daily_capacity(
    kind: AccommodationKind,
    annual: &[f64],
    decision_years: usize,
    extra_years: usize,
) -> Result<Vec<f64>, PlanError> {
    let Some(&final_level) = annual.get(decision_years) else {
        return Err(PlanError::PlanLength {
            kind,
            expected: decision_years + 1,
            actual: annual.len(),
        });
    };
    let per_day = DAYS_PER_YEAR as f64;

    Ok(annual[..=decision_years]
        .iter()
        .tuple_windows()
        .flat_map(|(&from, &to)| {
            (0..DAYS_PER_YEAR).map(move |day| from + (day as f64 / per_day) * (to - from))
        })
        .chain(std::iter::repeat(final_level).take(extra_years * DAYS_PER_YEAR + 1))
        .collect())
}

/// Daily housing and shelter profiles for a plan
pub fn plan_profiles(
    plan: &CapacityPlan,
    decision_years: usize,
    extra_years: usize,
) -> Result<PerKind<Vec<f64>>, PlanError> {
    let profile = |kind: AccommodationKind| {
        let levels = plan.levels(kind);
        if levels.len() != decision_years + 1 {
            return Err(PlanError::PlanLength {
                kind,
                expected: decision_years + 1,
                actual: levels.len(),
            });
        }
        daily_capacity(kind, levels, decision_years, extra_years)
    };

    Ok(PerKind {
        housing: profile(AccommodationKind::Housing)?,
        shelter: profile(AccommodationKind::Shelter)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_profile_length_and_endpoints() {
        let daily = daily_capacity(AccommodationKind::Housing, &[100.0, 465.0, 100.0], 2, 1).unwrap();
        assert_eq!(daily.len(), 3 * 365 + 1);
        assert_eq!(daily[0], 100.0);
        assert_eq!(daily[365], 465.0);
        assert_eq!(daily[730], 100.0);
        assert_eq!(*daily.last().unwrap(), 100.0);
    }

    #[test]
    fn test_profile_interpolates_daily() {
        let daily = daily_capacity(AccommodationKind::Housing, &[0.0, 365.0], 1, 0).unwrap();
        for (day, level) in daily.iter().enumerate() {
            assert!((level - day as f64).abs() < 1e-9, "day {day}: {level}");
        }
    }

    #[test]
    fn test_profile_holds_after_horizon() {
        let daily = daily_capacity(AccommodationKind::Shelter, &[10.0, 20.0], 1, 2).unwrap();
        assert!(daily[365..].iter().all(|&v| v == 20.0));
    }

    #[test]
    fn test_short_annual_levels_are_an_error() {
        assert_eq!(
            daily_capacity(AccommodationKind::Shelter, &[10.0], 2, 0),
            Err(PlanError::PlanLength {
                kind: AccommodationKind::Shelter,
                expected: 3,
                actual: 1,
            })
        );
        assert!(daily_capacity(AccommodationKind::Housing, &[], 0, 1).is_err());
    }

    #[test]
    fn test_plan_profiles_rejects_short_plan() {
        let plan = CapacityPlan::new(vec![1.0, 2.0], vec![1.0]);
        assert!(matches!(
            plan_profiles(&plan, 1, 0),
            Err(PlanError::PlanLength {
                kind: AccommodationKind::Shelter,
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn prop_profile_stays_between_annual_levels(
            levels in prop::collection::vec(0.0f64..1_000.0, 2..6),
            extra in 0usize..3,
        ) {
            let years = levels.len() - 1;
            let daily = daily_capacity(AccommodationKind::Housing, &levels, years, extra).unwrap();
            prop_assert_eq!(daily.len(), (years + extra) * DAYS_PER_YEAR + 1);

            for (year, (lo, hi)) in levels.iter().tuple_windows().enumerate() {
                let (min, max) = (lo.min(*hi), lo.max(*hi));
                for day in year * DAYS_PER_YEAR..=(year + 1) * DAYS_PER_YEAR {
                    prop_assert!(daily[day] >= min - 1e-9 && daily[day] <= max + 1e-9);
                }
            }
        }
    }
}
