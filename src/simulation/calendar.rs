use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Event wrapper for priority queue ordering
#[derive(Debug, Clone)]
struct Scheduled<E> {
    time: f64,
    seq: u64,
    event: E,
}

// Earliest time first; equal times in insertion order
impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse comparison for min-heap (BinaryHeap is max-heap by default)
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Scheduled<E> {}

/// Future event list of a discrete-event simulation
#[derive(Debug, Clone)]
pub struct Calendar<E> {
    now: f64,
    next_seq: u64,
    queue: BinaryHeap<Scheduled<E>>,
}

impl<E> Default for Calendar<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Calendar<E> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current simulation time
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `event` at absolute time `time` (never earlier than now)
    pub fn schedule_at(&mut self, time: f64, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            time: time.max(self.now),
            seq,
            event,
        });
    }

    /// Schedule `event` after `delay` from now
    pub fn schedule_in(&mut self, delay: f64, event: E) {
        self.schedule_at(self.now + delay.max(0.0), event);
    }

    /// Pop the next event strictly before `until`, advancing the clock
    pub fn next_before(&mut self, until: f64) -> Option<(f64, E)> {
        if self.queue.peek()?.time >= until {
            return None;
        }
        let next = self.queue.pop()?;
        self.now = next.time;
        Some((next.time, next.event))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_events_pop_in_time_order() {
        let mut cal = Calendar::new();
        cal.schedule_at(3.0, "c");
        cal.schedule_at(1.0, "a");
        cal.schedule_at(2.0, "b");

        assert_eq!(cal.next_before(10.0), Some((1.0, "a")));
        assert_eq!(cal.now(), 1.0);
        assert_eq!(cal.next_before(10.0), Some((2.0, "b")));
        assert_eq!(cal.next_before(10.0), Some((3.0, "c")));
        assert_eq!(cal.next_before(10.0), None);
    }

    #[test]
    fn test_ties_are_fifo() {
        let mut cal = Calendar::new();
        for i in 0..5 {
            cal.schedule_at(1.0, i);
        }
        let order: Vec<i32> = std::iter::from_fn(|| cal.next_before(2.0).map(|(_, e)| e)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stops_at_horizon() {
        let mut cal = Calendar::new();
        cal.schedule_at(1.0, 'a');
        cal.schedule_at(5.0, 'b');

        assert_eq!(cal.next_before(5.0), Some((1.0, 'a')));
        assert_eq!(cal.next_before(5.0), None);
        assert_eq!(cal.len(), 1);
    }

    #[test]
    fn test_cannot_schedule_in_the_past() {
        let mut cal = Calendar::new();
        cal.schedule_at(2.0, 1);
        cal.next_before(10.0);
        cal.schedule_in(-1.0, 2);
        assert_eq!(cal.next_before(10.0), Some((2.0, 2)));
    }

    proptest! {
        #[test]
        fn prop_clock_never_goes_backwards(times in prop::collection::vec(0.0f64..100.0, 1..50)) {
            let mut cal = Calendar::new();
            for (i, t) in times.iter().enumerate() {
                cal.schedule_at(*t, i);
            }
            let mut last = f64::NEG_INFINITY;
            while let Some((t, _)) = cal.next_before(f64::INFINITY) {
                prop_assert!(t >= last);
                last = t;
            }
            prop_assert!(cal.is_empty());
        }
    }
}
