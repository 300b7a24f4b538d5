mod controller;

pub use controller::WatchTracker;
