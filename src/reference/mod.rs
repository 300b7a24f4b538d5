//! Trusted reference time for captures.
//!
//! The service asks network time servers (through a pluggable client) and
//! falls back to the device clock. The last network offset is cached for a
//! short TTL so rapid captures don't hit the network each time.

pub mod cache;
pub mod service;
pub mod wall_clock;

pub use cache::OffsetCache;
pub use service::{DeviceClock, NetworkClock, NoNetwork, ReferenceTime, ReferenceTimeService, SystemClock};
pub use wall_clock::{format_time, format_time_short, WatchFaceTime};
