use std::collections::VecDeque;

use crate::domain::{AccommodationKind, PerKind};

/// A pending request for a unit of accommodation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// A customer waiting to move in
    Customer(usize),
    /// An outstanding order to take a unit out of service
    Demolition,
}

/// What happened to a unit that became available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handover {
    /// The unit went to a waiting customer
    Granted(usize),
    /// The unit was consumed by a pending demolition
    Demolished,
    /// Nobody was waiting; the unit is free
    Freed,
}

/// Outcome of a demolition order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demolition {
    /// A free unit was removed straight away
    Removed,
    /// No free unit of this kind; the order waits for the next release
    Pending,
    /// The stock had no free units at all; the order was dropped
    Dropped,
}

/// Time-weighted queue length since the end of the warm-up
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueueStats {
    /// Customers currently waiting
    pub length: u64,
    /// Integral of the queue length over time
    pub area: f64,
    pub last_update: f64,
}

impl QueueStats {
    fn step(&mut self, t: f64, up: bool) {
        self.area += self.length as f64 * (t - self.last_update);
        if up {
            self.length += 1;
        } else {
            self.length = self.length.saturating_sub(1);
        }
        self.last_update = t;
    }

    /// Time-average over `[0, horizon]`
    pub fn time_average(&self, horizon: f64) -> f64 {
        if horizon <= 0.0 {
            return 0.0;
        }
        let area = self.area + self.length as f64 * (horizon - self.last_update);
        area / horizon
    }
}

#[derive(Debug, Clone, Default)]
struct Pool {
    free: u64,
    waiting: VecDeque<Claim>,
}

/// Stock of housing and shelter units with FIFO waiting lists
#[derive(Debug, Clone)]
pub struct AccommodationStock {
    pools: PerKind<Pool>,
    queues: PerKind<QueueStats>,
    /// Queue lengths sampled by the development schedule
    samples: PerKind<Vec<u64>>,
}

impl AccommodationStock {
    pub fn new(initial: PerKind<u32>) -> Self {
        Self {
            pools: PerKind::new(
                Pool {
                    free: u64::from(initial.housing),
                    waiting: VecDeque::new(),
                },
                Pool {
                    free: u64::from(initial.shelter),
                    waiting: VecDeque::new(),
                },
            ),
            queues: PerKind::default(),
            samples: PerKind::default(),
        }
    }

    pub fn free(&self, kind: AccommodationKind) -> u64 {
        self.pools[kind].free
    }

    pub fn total_free(&self) -> u64 {
        self.pools.housing.free + self.pools.shelter.free
    }

    pub fn queue(&self, kind: AccommodationKind) -> &QueueStats {
        &self.queues[kind]
    }

    pub fn samples(&self, kind: AccommodationKind) -> &[u64] {
        &self.samples[kind]
    }

    /// Pending demolitions of a kind
    pub fn pending_demolitions(&self, kind: AccommodationKind) -> usize {
        self.pools[kind]
            .waiting
            .iter()
            .filter(|c| **c == Claim::Demolition)
            .count()
    }

    /// A customer asks for a unit at time `t` (relative to warm-up end).
    ///
    /// Returns true when a unit was free and is now held by the customer;
    /// otherwise the customer joins the FIFO waiting list.
    pub fn request(&mut self, kind: AccommodationKind, customer: usize, t: f64) -> bool {
        self.queues[kind].step(t, true);
        let pool = &mut self.pools[kind];
        if pool.free > 0 {
            pool.free -= 1;
            true
        } else {
            pool.waiting.push_back(Claim::Customer(customer));
            false
        }
    }

    /// A customer stops waiting because the unit was handed over
    pub fn served(&mut self, kind: AccommodationKind, t: f64) {
        self.queues[kind].step(t, false);
    }

    /// A unit becomes available (released by its occupant or newly built)
    pub fn release(&mut self, kind: AccommodationKind) -> Handover {
        let pool = &mut self.pools[kind];
        match pool.waiting.pop_front() {
            Some(Claim::Customer(id)) => Handover::Granted(id),
            Some(Claim::Demolition) => Handover::Demolished,
            None => {
                pool.free += 1;
                Handover::Freed
            }
        }
    }

    /// Take a unit out of service
    pub fn demolish(&mut self, kind: AccommodationKind) -> Demolition {
        if self.total_free() == 0 {
            return Demolition::Dropped;
        }
        let pool = &mut self.pools[kind];
        if pool.free > 0 {
            pool.free -= 1;
            Demolition::Removed
        } else {
            pool.waiting.push_back(Claim::Demolition);
            Demolition::Pending
        }
    }

    /// Record the current queue lengths
    pub fn sample(&mut self) {
        self.samples.housing.push(self.queues.housing.length);
        self.samples.shelter.push(self.queues.shelter.length);
    }
}
