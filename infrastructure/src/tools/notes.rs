//! Notes tools: note_write, notes_read
//!
//! Notes are an append-only JSONL sink shared by every phase of a run, so
//! Analysis and Setup can leave findings for the Planner and Coder.

use super::ToolContext;
use chrono::{SecondsFormat, Utc};
use patchpilot_domain::{
    ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult, ToolResultMetadata,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Tool name constants
pub const NOTE_WRITE: &str = "note_write";
pub const NOTES_READ: &str = "notes_read";

const DEFAULT_READ_LIMIT: usize = 20;

/// One line of `notes.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub ts: String,
    pub topic: String,
    pub content: String,
}

pub fn note_write_definition() -> ToolDefinition {
    ToolDefinition::new(
        NOTE_WRITE,
        "Record a finding for later phases (build commands, conventions, pitfalls).",
    )
    .with_parameter(ToolParameter::new("topic", "Short topic, e.g. 'build' or 'tests'", true))
    .with_parameter(ToolParameter::new("content", "The note text", true))
}

pub fn notes_read_definition() -> ToolDefinition {
    ToolDefinition::new(NOTES_READ, "Read recorded notes, newest first.")
        .with_parameter(ToolParameter::new("topic", "Only notes with this topic", false))
        .with_parameter(
            ToolParameter::new("limit", "Maximum notes to return (default: 20)", false)
                .with_type("integer"),
        )
}

pub fn execute_note_write(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let (topic, content) = match (call.require_string("topic"), call.require_string("content")) {
        (Ok(t), Ok(c)) => (t, c),
        (Err(e), _) | (_, Err(e)) => {
            return ToolResult::failure(NOTE_WRITE, ToolError::invalid_argument(e));
        }
    };

    let note = Note {
        ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        topic: topic.trim().to_string(),
        content: content.to_string(),
    };

    match append_note(&ctx.notes_path, &note) {
        Ok(()) => ToolResult::success(NOTE_WRITE, format!("NOTED [{}]", note.topic)),
        Err(e) => ToolResult::failure(
            NOTE_WRITE,
            ToolError::execution_failed(format!("Failed to write note: {}", e)),
        ),
    }
}

pub fn execute_notes_read(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let topic = call.get_string("topic").map(str::trim);
    let limit = call
        .get_i64("limit")
        .filter(|l| *l > 0)
        .map(|l| l as usize)
        .unwrap_or(DEFAULT_READ_LIMIT);

    let notes = match load_notes(&ctx.notes_path) {
        Ok(notes) => notes,
        Err(e) => {
            return ToolResult::failure(
                NOTES_READ,
                ToolError::execution_failed(format!("Failed to read notes: {}", e)),
            );
        }
    };

    let selected: Vec<&Note> = notes
        .iter()
        .rev()
        .filter(|n| topic.is_none_or(|t| n.topic == t))
        .take(limit)
        .collect();

    if selected.is_empty() {
        return ToolResult::success(NOTES_READ, "NO_NOTES");
    }

    let output = selected
        .iter()
        .map(|n| format!("[{}] {} ({})", n.topic, n.content, n.ts))
        .collect::<Vec<_>>()
        .join("\n");
    ToolResult::success(NOTES_READ, output).with_metadata(ToolResultMetadata {
        match_count: Some(selected.len()),
        ..Default::default()
    })
}

fn append_note(path: &Path, note: &Note) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(note)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// All parseable notes in file order. A missing file is an empty list.
pub fn load_notes(path: &Path) -> std::io::Result<Vec<Note>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolContext, ToolLimits};
    use tempfile::TempDir;

    fn setup() -> (TempDir, ToolContext) {
        let dir = TempDir::new().unwrap();
        let ctx =
            ToolContext::new(dir.path(), dir.path().join(".patchpilot"), ToolLimits::default())
                .unwrap();
        (dir, ctx)
    }

    fn write(ctx: &ToolContext, topic: &str, content: &str) {
        let call = ToolCall::new(NOTE_WRITE)
            .with_arg("topic", topic)
            .with_arg("content", content);
        assert!(execute_note_write(ctx, &call).is_success());
    }

    #[test]
    fn test_read_empty() {
        let (_dir, ctx) = setup();
        let result = execute_notes_read(&ctx, &ToolCall::new(NOTES_READ));
        assert_eq!(result.output, "NO_NOTES");
    }

    #[test]
    fn test_write_then_read_newest_first() {
        let (dir, ctx) = setup();
        write(&ctx, "build", "cargo build works");
        write(&ctx, "tests", "use cargo test -q");

        let result = execute_notes_read(&ctx, &ToolCall::new(NOTES_READ));
        let lines: Vec<&str> = result.output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[tests] use cargo test -q"));
        assert!(lines[1].starts_with("[build] cargo build works"));

        let raw = fs::read_to_string(dir.path().join(".patchpilot/notes.jsonl")).unwrap();
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(first["topic"], "build");
        assert!(first["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_read_topic_and_limit() {
        let (_dir, ctx) = setup();
        for i in 0..5 {
            write(&ctx, "build", &format!("b{}", i));
        }
        write(&ctx, "tests", "t0");

        let call = ToolCall::new(NOTES_READ)
            .with_arg("topic", "build")
            .with_arg("limit", 2);
        let result = execute_notes_read(&ctx, &call);
        let lines: Vec<&str> = result.output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[build] b4"));
        assert!(lines[1].starts_with("[build] b3"));

        let none = ToolCall::new(NOTES_READ).with_arg("topic", "deploy");
        assert_eq!(execute_notes_read(&ctx, &none).output, "NO_NOTES");
    }
}
