//! Infrastructure layer for patchpilot
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the local tool executor, the HTTP model
//! providers, the JSONL artifact recorder, and configuration file loading.

pub mod artifacts;
pub mod config;
pub mod prompts;
pub mod providers;
pub mod tools;


// Re-export commonly used types
pub use artifacts::{JsonlArtifactRecorder, read_transcript};
pub use config::{
    ConfigError, ConfigLoader, FileAgentConfig, FileConfig, FileModelConfig, FilePipelineConfig,
    FileRoleConfig, FileWorkspaceConfig,
};
pub use prompts::load_role_prompts;
pub use providers::{
    AnthropicGateway, OpenAiGateway, ProviderKind, ProviderSetupError, create_gateway,
    create_gateway_with_key,
};
pub use tools::{
    BuiltinTool, JsonSchemaToolConverter, LocalToolExecutor, ToolContext, ToolLimits, Workspace,
    default_tool_spec,
};
