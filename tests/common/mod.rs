//! Common test utilities for vkvideo-dl integration tests

#[allow(dead_code)]
pub mod assertions;
#[allow(dead_code)]
pub mod engines;
#[allow(dead_code)]
pub mod fake_ytdlp;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use engines::*;
#[allow(unused_imports)]
pub use fake_ytdlp::*;
