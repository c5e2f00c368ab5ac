/// An individual moving through the system
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: usize,
    /// Uniform draw deciding whether the next exit from housing is final
    pub reentry_draw: f64,
    pub holds_shelter: bool,
    /// Already housed at the start; the first housing stay is a residual stay
    pub residual_stay: bool,
}

impl Customer {
    pub fn new(id: usize, reentry_draw: f64) -> Self {
        Self {
            id,
            reentry_draw,
            holds_shelter: false,
            residual_stay: false,
        }
    }

    /// Customer that starts in housing part-way through a stay
    pub fn already_housed(id: usize, reentry_draw: f64) -> Self {
        Self {
            residual_stay: true,
            ..Self::new(id, reentry_draw)
        }
    }

    /// Whether leaving housing is final, given the re-entry probability
    pub fn leaves_for_good(&self, reentry_rate: f64) -> bool {
        self.reentry_draw >= reentry_rate
    }
}
