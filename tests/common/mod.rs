// tests/common/mod.rs
#![allow(dead_code, unused_imports)]

pub use livewatch_test_utils::builders;
pub use livewatch_test_utils::fake_launcher::{Call, FakeLauncher};
pub use livewatch_test_utils::fake_source::FakeWatchSource;
pub use livewatch_test_utils::{init_tracing, wait_until, with_timeout};

/// A string of `len` printable bytes.
pub fn long_command(len: usize) -> String {
    "x".repeat(len)
}
