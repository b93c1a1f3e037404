//! Run artifacts
//!
//! Machine-readable records of a run: transcripts, tool events, plan
//! snapshots and status changes.

mod jsonl_recorder;

pub use jsonl_recorder::{JsonlArtifactRecorder, read_transcript};
