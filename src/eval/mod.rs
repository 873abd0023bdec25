pub mod performance;
pub mod regime;
pub mod score;

pub use performance::{evaluate, EvalOptions, PerfStat};
pub use regime::{PricePoint, RegimeKind, RegimeSegment, RegimeSplit};
pub use score::{classification_scores, Scores};
