//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod agent_loop;
pub mod model_client;
pub mod phase_controller;
pub(crate) mod shared;

#[cfg(test)]
pub(crate) mod test_support;
