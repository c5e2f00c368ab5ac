pub mod constraints;
pub mod strategies;
pub mod types;

pub use constraints::*;
pub use strategies::*;
pub use types::*;

use crate::fluid::Objective;

/// Strategy suited to a problem's objective
pub fn strategy_for(kind: &ProblemKind, frank_wolfe: FrankWolfeStrategy) -> Box<dyn PlanningStrategy> {
    match kind.objective() {
        Objective::Linear => Box::new(LinearProgramStrategy),
        Objective::Quadratic => Box::new(frank_wolfe),
    }
}
