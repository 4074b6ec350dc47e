use std::str::FromStr;
use std::sync::Once;

use log::LevelFilter;
use simple_logger::SimpleLogger;

static INIT: Once = Once::new();

pub fn setup() {
    setup_with_level("info");
}

/// Initialise the global logger once. Unknown level names fall back to `info`.
pub fn setup_with_level(level: &str) {
    INIT.call_once(|| {
        let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
        SimpleLogger::new().with_level(level).init().unwrap();
    });
}

/// Number of rayon workers for fitness evaluation: all cores minus two, at least one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}
