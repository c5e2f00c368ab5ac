//! One replication of the care-system simulation
//!
//! Times are in years. Nothing happens during the warm-up; at its end the
//! initial population enters, arrivals start and the development schedule
//! begins adjusting the stock to the capacity plan.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Triangular};
use tracing::trace;

use super::{
    AccommodationStock, Calendar, Customer, Demolition, Handover, SimulationError,
    SimulationSettings,
};
use crate::capacity::DAYS_PER_YEAR;
use crate::domain::{AccommodationKind, PerKind, ScenarioData};

use AccommodationKind::{Housing, Shelter};

/// How a new customer enters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// Look for shelter, then housing
    Pathway,
    /// Already in housing at the start of the run
    Housing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    ArrivalsStart,
    DevelopmentStart,
    /// Candidate arrival of the thinned Poisson process
    Arrival,
    Start { customer: usize, entry: Entry },
    Granted { customer: usize, kind: AccommodationKind },
    ShelterStayOver(usize),
    HousingStayOver(usize),
    Build { step: u64 },
}

/// Per-replication results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationResult {
    pub seed: u64,
    /// Number unsheltered at each build step, starting from the initial count
    pub unsheltered_over_time: Vec<f64>,
    /// Time-average number waiting for shelter over the modelled horizon
    pub mean_unsheltered: f64,
    /// Time-average number in shelter waiting for housing
    pub mean_waiting_housing: f64,
    pub arrivals: u64,
    /// Accepted arrivals in each modelled year
    pub arrivals_per_year: Vec<u64>,
    pub reentries: u64,
    pub exits: u64,
    pub units_built: PerKind<u64>,
    pub units_demolished: PerKind<u64>,
    /// Demolition orders that had to wait for a unit to be vacated
    pub demolitions_deferred: PerKind<u64>,
    /// Deferred orders still waiting at the end of the run
    pub demolitions_outstanding: PerKind<u64>,
    pub demolitions_dropped: u64,
}

pub struct Replication<'a> {
    data: &'a ScenarioData,
    profiles: &'a PerKind<Vec<f64>>,
    warm_up: f64,
    end: f64,
    build_interval_days: f64,
    max_rate: f64,
    calendar: Calendar<Event>,
    stock: AccommodationStock,
    customers: Vec<Customer>,
    rng: StdRng,
    seed: u64,
    shelter_stay: Option<Exp<f64>>,
    housing_stay: Triangular,
    inter_arrival: Option<Exp<f64>>,
    arrivals_per_year: Vec<u64>,
    reentries: u64,
    exits: u64,
    built: PerKind<u64>,
    demolished: PerKind<u64>,
    deferred: PerKind<u64>,
    demolitions_dropped: u64,
}

impl<'a> Replication<'a> {
    pub fn new(
        data: &'a ScenarioData,
        settings: &SimulationSettings,
        profiles: &'a PerKind<Vec<f64>>,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        let shelter_stay = if data.service_mean.shelter > 0.0 {
            Some(
                Exp::new(1.0 / data.service_mean.shelter)
                    .map_err(|e| SimulationError::Distribution(e.to_string()))?,
            )
        } else {
            None
        };

        let tri = data.housing_stay;
        let housing_stay = Triangular::new(tri.low, tri.high, tri.mode)
            .map_err(|e| SimulationError::Distribution(e.to_string()))?;

        let max_rate = data.max_arrival_rate();
        let inter_arrival = if max_rate > 0.0 {
            Some(Exp::new(max_rate).map_err(|e| SimulationError::Distribution(e.to_string()))?)
        } else {
            None
        };

        let warm_up = settings.warm_up_years;
        Ok(Self {
            data,
            profiles,
            warm_up,
            end: warm_up + data.modelled_years() as f64,
            build_interval_days: settings.build_interval_days,
            max_rate,
            calendar: Calendar::new(),
            stock: AccommodationStock::new(data.initial_capacity),
            customers: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            shelter_stay,
            housing_stay,
            inter_arrival,
            arrivals_per_year: vec![0; data.modelled_years()],
            reentries: 0,
            exits: 0,
            built: PerKind::default(),
            demolished: PerKind::default(),
            deferred: PerKind::default(),
            demolitions_dropped: 0,
        })
    }

    /// Run to the end of the horizon and collect the statistics
    pub fn run(mut self) -> ReplicationResult {
        self.calendar.schedule_at(self.warm_up, Event::ArrivalsStart);
        self.calendar.schedule_at(self.warm_up, Event::DevelopmentStart);

        while let Some((_, event)) = self.calendar.next_before(self.end) {
            self.handle(event);
        }

        self.finish()
    }

    /// Time since the end of the warm-up
    fn elapsed(&self) -> f64 {
        self.calendar.now() - self.warm_up
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::ArrivalsStart => self.start_arrivals(),
            Event::DevelopmentStart => {
                self.stock.sample();
                self.schedule_build(1);
            }
            Event::Arrival => {
                // accept the candidate with probability rate(t) / max rate
                let rate = self.data.arrival_rate_at(self.elapsed());
                if self.rng.gen::<f64>() * self.max_rate <= rate {
                    self.count_arrival();
                    let id = self.new_customer(false);
                    self.calendar.schedule_in(
                        0.0,
                        Event::Start {
                            customer: id,
                            entry: Entry::Pathway,
                        },
                    );
                }
                self.schedule_arrival();
            }
            Event::Start { customer, entry } => match entry {
                Entry::Pathway => self.request(customer, Shelter),
                Entry::Housing => self.request(customer, Housing),
            },
            Event::Granted { customer, kind } => self.granted(customer, kind),
            Event::ShelterStayOver(customer) => self.request(customer, Housing),
            Event::HousingStayOver(customer) => self.leave_housing(customer),
            Event::Build { step } => {
                self.build();
                self.stock.sample();
                self.schedule_build(step + 1);
            }
        }
    }

    fn new_customer(&mut self, already_housed: bool) -> usize {
        let id = self.customers.len();
        let draw = self.rng.gen::<f64>();
        self.customers.push(if already_housed {
            Customer::already_housed(id, draw)
        } else {
            Customer::new(id, draw)
        });
        id
    }

    fn start_arrivals(&mut self) {
        let housed = self.data.initial_capacity.housing;
        for _ in 0..housed {
            let id = self.new_customer(true);
            self.calendar.schedule_in(
                0.0,
                Event::Start {
                    customer: id,
                    entry: Entry::Housing,
                },
            );
        }

        let waiting = self.data.initial_demand.saturating_sub(housed);
        for _ in 0..waiting {
            let id = self.new_customer(false);
            self.calendar.schedule_in(
                0.0,
                Event::Start {
                    customer: id,
                    entry: Entry::Pathway,
                },
            );
        }

        self.schedule_arrival();
    }

    /// Next candidate of the thinned non-homogeneous Poisson process
    fn schedule_arrival(&mut self) {
        let Some(inter_arrival) = self.inter_arrival else {
            return;
        };
        let wait = inter_arrival.sample(&mut self.rng);
        self.calendar.schedule_in(wait, Event::Arrival);
    }

    fn count_arrival(&mut self) {
        let last = self.arrivals_per_year.len().saturating_sub(1);
        let year = (self.elapsed().max(0.0).floor() as usize).min(last);
        if let Some(count) = self.arrivals_per_year.get_mut(year) {
            *count += 1;
        }
    }

    fn request(&mut self, customer: usize, kind: AccommodationKind) {
        let t = self.elapsed();
        if self.stock.request(kind, customer, t) {
            self.calendar
                .schedule_in(0.0, Event::Granted { customer, kind });
        }
    }

    fn release(&mut self, kind: AccommodationKind) {
        match self.stock.release(kind) {
            Handover::Granted(customer) => {
                self.calendar
                    .schedule_in(0.0, Event::Granted { customer, kind });
            }
            Handover::Demolished => self.demolished[kind] += 1,
            Handover::Freed => {}
        }
    }

    fn granted(&mut self, customer: usize, kind: AccommodationKind) {
        let t = self.elapsed();
        self.stock.served(kind, t);

        match kind {
            Shelter => {
                self.customers[customer].holds_shelter = true;
                let stay = match &self.shelter_stay {
                    Some(dist) => dist.sample(&mut self.rng),
                    None => 0.0,
                };
                self.calendar
                    .schedule_in(stay, Event::ShelterStayOver(customer));
            }
            Housing => {
                let holds_shelter = self.customers[customer].holds_shelter;
                if holds_shelter {
                    self.customers[customer].holds_shelter = false;
                    self.release(Shelter);
                }

                let residual = std::mem::take(&mut self.customers[customer].residual_stay);
                let stay = if residual {
                    self.residual_housing_stay()
                } else {
                    self.housing_stay.sample(&mut self.rng)
                };
                self.calendar
                    .schedule_in(stay, Event::HousingStayOver(customer));
            }
        }
    }

    /// Remaining stay of someone already housed at the start: with
    /// `x0 ~ Tri` as time already served, draw `x ~ Tri | x >= x0` and stay `x - x0`
    fn residual_housing_stay(&mut self) -> f64 {
        let served_q = self.rng.gen::<f64>();
        let served = self.housing_stay.inverse_cdf(served_q);
        let total_q = self.rng.gen_range(served_q..1.0);
        let total = self.housing_stay.inverse_cdf(total_q);
        (total - served).max(0.0)
    }

    fn leave_housing(&mut self, customer: usize) {
        self.release(Housing);

        let reentry_rate = self.data.reentry_rate;
        if self.customers[customer].leaves_for_good(reentry_rate) {
            self.exits += 1;
            return;
        }

        self.customers[customer].reentry_draw = self.rng.gen::<f64>();
        self.reentries += 1;
        self.request(customer, Shelter);
    }

    fn schedule_build(&mut self, step: u64) {
        let at = self.warm_up + step as f64 * self.build_interval_days / DAYS_PER_YEAR as f64;
        self.calendar.schedule_at(at, Event::Build { step });
    }

    /// Move the stock toward the planned capacity for the current day
    fn build(&mut self) {
        let days = self.profiles.housing.len();
        let day = ((self.elapsed() * DAYS_PER_YEAR as f64).round() as usize).clamp(1, days - 1);

        for kind in [Shelter, Housing] {
            let profile = &self.profiles[kind];
            let change = profile[day].floor() as i64 - profile[day - 1].floor() as i64;

            if change > 0 {
                for _ in 0..change {
                    self.built[kind] += 1;
                    self.release(kind);
                }
            } else if change < 0 {
                for _ in 0..change.unsigned_abs() {
                    match self.stock.demolish(kind) {
                        Demolition::Removed => self.demolished[kind] += 1,
                        Demolition::Pending => self.deferred[kind] += 1,
                        Demolition::Dropped => self.demolitions_dropped += 1,
                    }
                }
            }
        }

        trace!(
            day,
            free_housing = self.stock.free(Housing),
            free_shelter = self.stock.free(Shelter),
            "development step"
        );
    }

    fn finish(self) -> ReplicationResult {
        let horizon = self.end - self.warm_up;

        let mut unsheltered_over_time = vec![self.data.initial_unsheltered()];
        unsheltered_over_time.extend(
            self.stock
                .samples(Shelter)
                .iter()
                .skip(1)
                .map(|&q| q as f64),
        );

        ReplicationResult {
            seed: self.seed,
            unsheltered_over_time,
            mean_unsheltered: self.stock.queue(Shelter).time_average(horizon),
            mean_waiting_housing: self.stock.queue(Housing).time_average(horizon),
            arrivals: self.arrivals_per_year.iter().sum(),
            arrivals_per_year: self.arrivals_per_year,
            reentries: self.reentries,
            exits: self.exits,
            units_built: self.built,
            units_demolished: self.demolished,
            demolitions_deferred: self.deferred,
            demolitions_outstanding: PerKind::new(
                self.stock.pending_demolitions(Housing) as u64,
                self.stock.pending_demolitions(Shelter) as u64,
            ),
            demolitions_dropped: self.demolitions_dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::plan_profiles;
    use crate::domain::scenario::fixtures::small_scenario;
    use crate::domain::CapacityPlan;

    fn settings() -> SimulationSettings {
        SimulationSettings {
            enabled: true,
            replications: 1,
            warm_up_years: 0.5,
            build_interval_days: 1.0,
            seed: 7,
            percentile: 90.0,
        }
    }

    fn run(data: &ScenarioData, plan: &CapacityPlan, seed: u64) -> ReplicationResult {
        let profiles = plan_profiles(plan, data.decision_years, data.extra_years).unwrap();
        Replication::new(data, &settings(), &profiles, seed)
            .unwrap()
            .run()
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = small_scenario();
        let plan = CapacityPlan::from_initial(&data);
        assert_eq!(run(&data, &plan, 11), run(&data, &plan, 11));
    }

    #[test]
    fn test_sample_count_matches_horizon() {
        let data = small_scenario();
        let plan = CapacityPlan::from_initial(&data);
        let result = run(&data, &plan, 1);
        // one sample per day plus the initial count
        assert_eq!(result.unsheltered_over_time.len(), data.modelled_days());
        assert_eq!(result.unsheltered_over_time[0], data.initial_unsheltered());
    }

    #[test]
    fn test_no_arrivals_no_capacity_change_drains_queue() {
        let data = ScenarioData {
            arrival_rates: vec![0.0, 0.0, 0.0],
            reentry_rate: 0.0,
            initial_demand: 60,
            ..small_scenario()
        };
        let plan = CapacityPlan::from_initial(&data);
        let result = run(&data, &plan, 3);

        assert_eq!(result.arrivals, 0);
        // everyone initially present is housed or sheltered from the start
        assert!(result.unsheltered_over_time.iter().all(|&u| u == 0.0));
        assert_eq!(result.mean_unsheltered, 0.0);
    }

    #[test]
    fn test_overloaded_system_builds_a_queue() {
        let data = ScenarioData {
            arrival_rates: vec![400.0, 400.0, 400.0],
            ..small_scenario()
        };
        let plan = CapacityPlan::from_initial(&data);
        let result = run(&data, &plan, 5);

        assert!(result.arrivals > 800);
        let last = *result.unsheltered_over_time.last().unwrap();
        assert!(last > 500.0, "queue only reached {last}");
        assert!(result.mean_unsheltered > 100.0);
    }

    #[test]
    fn test_building_follows_plan() {
        let data = small_scenario();
        let plan = CapacityPlan::new(vec![40.0, 60.0, 60.0], vec![20.0, 30.0, 10.0]);
        let result = run(&data, &plan, 9);

        assert_eq!(result.units_built.housing, 20);
        assert_eq!(result.units_built.shelter, 10);
        // every one of the 20 shelter orders in year two is removed, dropped or still waiting
        assert_eq!(
            result.units_demolished.shelter
                + result.demolitions_dropped
                + result.demolitions_outstanding.shelter,
            20
        );
        assert!(result.demolitions_outstanding.shelter <= result.demolitions_deferred.shelter);
        assert_eq!(result.units_demolished.housing, 0);
    }

    #[test]
    fn test_full_shelter_defers_demolition() {
        // beds stay occupied for decades and a queue waits behind them, while
        // the housing built in year one leaves free units elsewhere in the stock
        let data = ScenarioData {
            arrival_rates: vec![0.0, 0.0, 0.0],
            reentry_rate: 0.0,
            service_mean: PerKind::new(2.0, 50.0),
            ..small_scenario()
        };
        let plan = CapacityPlan::new(vec![40.0, 60.0, 60.0], vec![20.0, 20.0, 10.0]);
        let result = run(&data, &plan, 4);

        assert_eq!(result.units_built.housing, 20);
        assert_eq!(result.demolitions_deferred.shelter, 10);
        assert_eq!(result.demolitions_dropped, 0);
        assert_eq!(
            result.units_demolished.shelter + result.demolitions_outstanding.shelter,
            10
        );
    }

    #[test]
    fn test_certain_reentry_means_nobody_leaves() {
        let data = ScenarioData {
            reentry_rate: 1.0,
            ..small_scenario()
        };
        let result = run(&data, &CapacityPlan::from_initial(&data), 6);

        assert_eq!(result.exits, 0);
        assert!(result.reentries > 0);
    }

    #[test]
    fn test_no_reentry_means_every_exit_is_final() {
        let data = ScenarioData {
            reentry_rate: 0.0,
            ..small_scenario()
        };
        let result = run(&data, &CapacityPlan::from_initial(&data), 6);

        assert_eq!(result.reentries, 0);
        assert!(result.exits > 0);
    }

    #[test]
    fn test_arrivals_follow_yearly_rates() {
        let data = ScenarioData {
            arrival_rates: vec![50.0, 400.0, 100.0],
            ..small_scenario()
        };
        let result = run(&data, &CapacityPlan::from_initial(&data), 8);
        let per_year = &result.arrivals_per_year;

        assert_eq!(per_year.len(), 3);
        assert_eq!(per_year.iter().sum::<u64>(), result.arrivals);
        assert!((20..90).contains(&per_year[0]), "year one: {}", per_year[0]);
        assert!((300..500).contains(&per_year[1]), "year two: {}", per_year[1]);
        assert!((60..150).contains(&per_year[2]), "year three: {}", per_year[2]);
        assert!(per_year[1] > per_year[2] && per_year[2] > per_year[0]);
    }

    #[test]
    fn test_residual_stay_is_within_support() {
        let data = small_scenario();
        let profiles =
            plan_profiles(&CapacityPlan::from_initial(&data), data.decision_years, data.extra_years)
                .unwrap();
        let mut rep = Replication::new(&data, &settings(), &profiles, 2).unwrap();
        for _ in 0..1_000 {
            let stay = rep.residual_housing_stay();
            assert!((0.0..=data.housing_stay.high - data.housing_stay.low).contains(&stay));
        }
    }
}
