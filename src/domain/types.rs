use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use strum::{Display, EnumIter};

// ============================================================================
// Accommodation
// ============================================================================

/// Kind of accommodation unit offered by the care system
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccommodationKind {
    /// Permanent housing; people leave the system from here
    Housing,
    /// Temporary shelter; people wait here for housing
    Shelter,
}

/// A value kept once per accommodation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerKind<T> {
    pub housing: T,
    pub shelter: T,
}

impl<T> PerKind<T> {
    pub fn new(housing: T, shelter: T) -> Self {
        Self { housing, shelter }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerKind<U> {
        PerKind {
            housing: f(self.housing),
            shelter: f(self.shelter),
        }
    }
}

impl<T> Index<AccommodationKind> for PerKind<T> {
    type Output = T;

    fn index(&self, kind: AccommodationKind) -> &T {
        match kind {
            AccommodationKind::Housing => &self.housing,
            AccommodationKind::Shelter => &self.shelter,
        }
    }
}

impl<T> IndexMut<AccommodationKind> for PerKind<T> {
    fn index_mut(&mut self, kind: AccommodationKind) -> &mut T {
        match kind {
            AccommodationKind::Housing => &mut self.housing,
            AccommodationKind::Shelter => &mut self.shelter,
        }
    }
}

// ============================================================================
// Length-of-stay distributions
// ============================================================================

/// Triangular length-of-stay parameters (years)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularParams {
    pub low: f64,
    pub mode: f64,
    pub high: f64,
}

impl TriangularParams {
    pub fn new(low: f64, mode: f64, high: f64) -> Self {
        Self { low, mode, high }
    }

    /// Mean of the distribution
    pub fn mean(&self) -> f64 {
        (self.low + self.mode + self.high) / 3.0
    }

    pub fn is_valid(&self) -> bool {
        self.low.is_finite()
            && self.high.is_finite()
            && self.low >= 0.0
            && self.low < self.high
            && (self.low..=self.high).contains(&self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_per_kind_indexing() {
        let mut caps = PerKind::new(10, 4);
        assert_eq!(caps[AccommodationKind::Housing], 10);
        assert_eq!(caps[AccommodationKind::Shelter], 4);

        caps[AccommodationKind::Shelter] += 1;
        assert_eq!(caps.shelter, 5);
    }

    #[test]
    fn test_per_kind_map() {
        let caps = PerKind::new(3u32, 7u32).map(f64::from);
        assert_eq!(caps, PerKind::new(3.0, 7.0));
    }

    #[test]
    fn test_kind_display() {
        let names: Vec<String> = AccommodationKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["housing", "shelter"]);
    }

    #[test]
    fn test_triangular_validity() {
        assert!(TriangularParams::new(1.0, 2.0, 5.0).is_valid());
        assert!(TriangularParams::new(1.0, 1.0, 5.0).is_valid());
        assert!(!TriangularParams::new(1.0, 6.0, 5.0).is_valid());
        assert!(!TriangularParams::new(2.0, 2.0, 2.0).is_valid());
        assert!(!TriangularParams::new(-1.0, 0.0, 1.0).is_valid());
    }

    #[test]
    fn test_triangular_mean() {
        let tri = TriangularParams::new(1.0, 2.0, 6.0);
        assert!((tri.mean() - 3.0).abs() < 1e-12);
    }
}
