//! Score directors keep the working solution and its score in lockstep.

mod incremental;
mod recording;
mod traits;

pub use incremental::IncrementalScoreDirector;
pub use recording::RecordingScoreDirector;
pub use traits::ScoreDirector;
