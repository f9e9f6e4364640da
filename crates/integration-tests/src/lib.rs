//! # Integration Tests
//!
//! Cross-subsystem scenarios exercising the whole consensus pipeline:
//! schedule → assemble → seal → verify → connect → (disconnect).
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! ├── src/
//! │   ├── lib.rs                 # This file
//! │   ├── harness.rs             # TestChain: genesis state + block driver
//! │   └── pipeline_scenarios.rs  # End-to-end scenarios
//! ```
//!
//! The harness owns every delegate key, so whichever delegate a slot lands
//! on, the chain can produce. Time is passed explicitly; scenarios advance
//! it by whole block intervals.

pub mod harness;

#[cfg(test)]
mod pipeline_scenarios;

pub use harness::TestChain;
