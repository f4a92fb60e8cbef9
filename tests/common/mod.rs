#![allow(dead_code)]

mod mocks;

pub use mocks::MockRowSink;

/// Builds an owned row from string slices.
pub fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
