pub mod color;
pub mod phase;
pub mod session;
pub mod stimulus;
pub mod trial;

pub use color::{InkColor, ParseColorError};
pub use phase::{GamePhase, Phase};
pub use session::SessionRecord;
pub use stimulus::{DigitSequence, Stimulus, StroopStimulus};
pub use trial::{MemoryTrial, Outcome, StroopTrial};
