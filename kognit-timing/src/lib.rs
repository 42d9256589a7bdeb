pub mod cancel;
pub mod countdown;
pub mod timer;

pub use cancel::CancelToken;
pub use countdown::{Countdown, TickResult};
pub use timer::{HighPrecisionTimer, ManualClock, Timer};
