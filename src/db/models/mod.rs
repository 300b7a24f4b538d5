pub mod measurement;
pub mod watch;

pub use measurement::{Measurement, TimeSource};
pub use watch::{MovementType, NewWatch, Watch, WatchSummary, WatchUpdate};
