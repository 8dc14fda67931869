pub mod common;

pub use babylon_e2e_core::{adjust_timeout, logging::init_test_logging};
