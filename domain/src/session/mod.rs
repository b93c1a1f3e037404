//! Conversation session domain
//!
//! Messages exchanged with the model and the bounded history that holds
//! them for one phase run.

pub mod entities;
pub mod history;

pub use entities::{Message, Role};
pub use history::{ConversationHistory, HistoryBudget, KeepLast, TranscriptEntry};
