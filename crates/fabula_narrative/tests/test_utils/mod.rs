//! Test utilities for Fabula pipeline tests.
//!
//! This module provides a scripted completion driver and story fixtures.

pub mod fixtures;
pub mod mock_driver;

#[allow(unused_imports)]
pub use fixtures::{
    LIGHTHOUSE_SEED, analysis_json, extraction_json, fast_config, review_json, scene_text,
};
#[allow(unused_imports)]
pub use mock_driver::{MockDriver, MockResponse, RequestKind};
