#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use buildwarden::watchdog::WatchConfig;

pub use buildwarden_test_utils::{append_lines, init_tracing, with_timeout};

/// Poll interval used by the real-time watchdog tests.
pub const POLL: Duration = Duration::from_millis(50);

/// Watch config with default signatures and markers, a 50ms poll and the
/// given hang budget.
pub fn watch_config(log: &Path, hang_timeout: Duration) -> WatchConfig {
    WatchConfig::new(log)
        .hang_timeout(hang_timeout)
        .poll_interval(POLL)
}
