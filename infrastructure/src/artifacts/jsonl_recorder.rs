//! JSONL artifact recorder.
//!
//! Layout under the artifacts directory:
//!
//! ```text
//! transcripts/<phase>-<run>.jsonl   append / evict entries, replayable
//! events.jsonl                      one line per tool execution
//! status.jsonl                      phase lifecycle changes
//! plan-<phase>-<run>.json           latest plan snapshot
//! run.json                          final run report
//! ```
//!
//! Lines are flushed as they are written so a crashed run still leaves a
//! readable record.

use patchpilot_application::{ArtifactRecorder, PhaseRunId, StatusEvent, ToolEvent};
use patchpilot_domain::{
    ConversationHistory, HistoryBudget, Plan, RunReport, TranscriptEntry, truncate,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

const SUMMARY_CHARS: usize = 200;

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Recorder writing every artifact as JSON files under one directory.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlArtifactRecorder {
    dir: PathBuf,
    events: Mutex<BufWriter<File>>,
    status: Mutex<BufWriter<File>>,
    transcripts: Mutex<HashMap<PhaseRunId, BufWriter<File>>>,
}

impl JsonlArtifactRecorder {
    /// Create the recorder, creating `dir` and truncating any previous
    /// event and status streams in it.
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join("transcripts"))?;
        let events = File::create(dir.join("events.jsonl"))?;
        let status = File::create(dir.join("status.jsonl"))?;

        Ok(Self {
            dir,
            events: Mutex::new(BufWriter::new(events)),
            status: Mutex::new(BufWriter::new(status)),
            transcripts: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn transcript_path(&self, run: PhaseRunId) -> PathBuf {
        self.dir
            .join("transcripts")
            .join(format!("{}.jsonl", run.label()))
    }

    pub fn plan_path(&self, run: PhaseRunId) -> PathBuf {
        self.dir.join(format!("plan-{}.json", run.label()))
    }

    fn write_json_file(&self, path: &Path, value: &impl Serialize) {
        let result = serde_json::to_string_pretty(value)
            .map_err(io::Error::from)
            .and_then(|text| fs::write(path, text));
        if let Err(e) = result {
            warn!("Could not write artifact {}: {}", path.display(), e);
        }
    }
}

fn append_line(writer: &mut BufWriter<File>, value: &impl Serialize) -> io::Result<()> {
    let line = serde_json::to_string(value).map_err(io::Error::from)?;
    writeln!(writer, "{}", line)?;
    writer.flush()
}

impl ArtifactRecorder for JsonlArtifactRecorder {
    fn transcript(&self, run: PhaseRunId, entry: &TranscriptEntry) {
        let Ok(mut transcripts) = self.transcripts.lock() else {
            return;
        };
        let writer = match transcripts.entry(run) {
            Entry::Occupied(open) => open.into_mut(),
            Entry::Vacant(slot) => {
                let path = self.transcript_path(run);
                match File::create(&path) {
                    Ok(file) => slot.insert(BufWriter::new(file)),
                    Err(e) => {
                        warn!("Could not create transcript {}: {}", path.display(), e);
                        return;
                    }
                }
            }
        };
        if let Err(e) = append_line(writer, entry) {
            warn!(run = %run.label(), "Could not append transcript entry: {}", e);
        }
    }

    fn tool_event(&self, event: &ToolEvent) {
        let record = json!({
            "timestamp": timestamp(),
            "phase": event.run.label(),
            "tool": event.tool,
            "args_summary": truncate(&event.args_summary, SUMMARY_CHARS),
            "result_summary": truncate(&event.result_summary, SUMMARY_CHARS),
            "elapsed_ms": event.elapsed_ms,
            "error": event.error.map(|k| k.as_str()),
        });
        if let Ok(mut writer) = self.events.lock()
            && let Err(e) = append_line(&mut writer, &record)
        {
            warn!("Could not append tool event: {}", e);
        }
    }

    fn plan_snapshot(&self, run: PhaseRunId, plan: &Plan) {
        self.write_json_file(&self.plan_path(run), plan);
    }

    fn status(&self, event: &StatusEvent) {
        let record = json!({
            "phase": event.run.phase,
            "run": event.run.run,
            "state": event.state,
            "step_count": event.step_count,
            "reason": event.reason,
            "timestamp": timestamp(),
        });
        if let Ok(mut writer) = self.status.lock()
            && let Err(e) = append_line(&mut writer, &record)
        {
            warn!("Could not append status event: {}", e);
        }
    }

    fn run_report(&self, report: &RunReport) {
        self.write_json_file(&self.dir.join("run.json"), report);
    }
}

impl Drop for JsonlArtifactRecorder {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.events.lock() {
            let _ = writer.flush();
        }
        if let Ok(mut writer) = self.status.lock() {
            let _ = writer.flush();
        }
        if let Ok(mut transcripts) = self.transcripts.lock() {
            for writer in transcripts.values_mut() {
                let _ = writer.flush();
            }
        }
    }
}

/// Replay a transcript file into the history it describes.
///
/// The result holds exactly the messages that were retained when the
/// transcript was written; evicted messages stay evicted.
pub fn read_transcript(path: impl AsRef<Path>) -> io::Result<ConversationHistory> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut entries = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: TranscriptEntry = serde_json::from_str(&line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", number + 1, e),
            )
        })?;
        entries.push(entry);
    }
    Ok(ConversationHistory::from_transcript(
        HistoryBudget::unbounded(),
        entries,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchpilot_domain::{
        KeepLast, Message, Phase, PhaseStatus, ReasonCode, Step, ToolCall, ToolErrorKind,
        ToolResult,
    };
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_transcript_replay_matches_retained_history() {
        let dir = TempDir::new().unwrap();
        let recorder = JsonlArtifactRecorder::new(dir.path()).unwrap();
        let run = PhaseRunId::new(Phase::Coder, 1);

        let mut history = ConversationHistory::new(HistoryBudget::new(120, KeepLast::Last(2)));
        let messages = vec![
            Message::system("You are the coder."),
            Message::user("Fix the parser"),
            Message::assistant_with_calls(
                "Reading",
                vec![ToolCall::new("read_file").with_id("c1").with_arg("path", "src/parser.rs")],
            ),
            Message::tool(
                ToolResult::success("read_file", "fn parse() {}".repeat(5)).with_call_id("c1"),
            ),
            Message::assistant("Now patching"),
            Message::user("Turn 3"),
        ];
        for message in messages {
            let (_, evicted) = history.append(message);
            recorder.transcript(run, &TranscriptEntry::Append(history.last().unwrap().clone()));
            if !evicted.is_empty() {
                recorder.transcript(run, &TranscriptEntry::Evict { indices: evicted });
            }
        }
        assert!(history.evicted_count() > 0);

        let replayed = read_transcript(recorder.transcript_path(run)).unwrap();
        assert_eq!(replayed.view(), history.view());
    }

    #[test]
    fn test_events_and_status_lines() {
        let dir = TempDir::new().unwrap();
        let recorder = JsonlArtifactRecorder::new(dir.path()).unwrap();
        let run = PhaseRunId::new(Phase::TestLint, 2);

        recorder.tool_event(&ToolEvent {
            run,
            tool: "shell".into(),
            args_summary: "{\"command\":\"sleep 5\"}".into(),
            result_summary: "x".repeat(1000),
            elapsed_ms: 2003,
            error: Some(ToolErrorKind::Timeout),
        });
        recorder.status(&StatusEvent {
            run,
            state: PhaseStatus::Incomplete,
            step_count: 7,
            reason: Some(ReasonCode::StepBudgetExceeded),
        });

        let events = read_lines(&dir.path().join("events.jsonl"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["phase"], "testlint-2");
        assert_eq!(events[0]["elapsed_ms"], 2003);
        assert_eq!(events[0]["error"], ToolErrorKind::Timeout.as_str());
        assert!(events[0]["result_summary"].as_str().unwrap().len() <= 210);
        assert!(events[0]["timestamp"].as_str().unwrap().ends_with('Z'));

        let status = read_lines(&dir.path().join("status.jsonl"));
        assert_eq!(status[0]["phase"], "testlint");
        assert_eq!(status[0]["run"], 2);
        assert_eq!(status[0]["state"], "incomplete");
        assert_eq!(status[0]["step_count"], 7);
        assert_eq!(status[0]["reason"], "step_budget_exceeded");
    }

    #[test]
    fn test_plan_snapshot_is_replaced() {
        let dir = TempDir::new().unwrap();
        let recorder = JsonlArtifactRecorder::new(dir.path()).unwrap();
        let run = PhaseRunId::new(Phase::Planner, 1);

        let mut plan = Plan {
            steps: vec![Step::new("s1", "Add the flag")],
        };
        recorder.plan_snapshot(run, &plan);
        plan.steps[0].completed = true;
        recorder.plan_snapshot(run, &plan);

        let text = fs::read_to_string(recorder.plan_path(run)).unwrap();
        let saved: Plan = serde_json::from_str(&text).unwrap();
        assert_eq!(saved, plan);
    }

    #[test]
    fn test_bad_transcript_line_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.jsonl");
        fs::write(&path, "{\"kind\":\"evict\",\"indices\":[]}\nnot json\n").unwrap();
        let err = read_transcript(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().starts_with("line 2"));
    }
}
