//! Integration test driver for `tests/integration/` submodules.
//!
//! Everything runs on the host against the simulated buses in
//! [`mock_hw`]; no real hardware is required.

mod mock_hw;
mod node_cycle_tests;
