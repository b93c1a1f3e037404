//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod agent_progress;
pub mod artifact_recorder;
pub mod llm_gateway;
pub mod tool_executor;
