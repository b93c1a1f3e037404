//! Application layer for patchpilot
//!
//! This crate contains the use cases (model client, agent loop, phase
//! controller) and the port definitions adapters implement.
//! It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    agent_progress::{AgentProgressNotifier, NoAgentProgress},
    artifact_recorder::{ArtifactRecorder, NoArtifacts, PhaseRunId, StatusEvent, ToolEvent},
    llm_gateway::{GatewayError, LlmGateway, ProviderReply, ProviderToolCall},
    tool_executor::ToolExecutorPort,
};
pub use use_cases::agent_loop::{AgentLoop, PhaseRequest, RunInterrupted};
pub use use_cases::model_client::{ModelClient, ModelClientConfig, ModelClientError, ModelExchange};
pub use use_cases::phase_controller::{PhaseController, PhaseControllerError};
