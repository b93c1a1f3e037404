//! Patch tool: apply_patch
//!
//! Applies a multi-file patch envelope:
//!
//! ```text
//! *** Begin Patch
//! *** Add File: path
//! +line
//! *** Delete File: path
//! *** Update File: path
//! @@ optional anchor
//!  context
//! -removed
//! +added
//! *** End of File
//! *** End Patch
//! ```
//!
//! Every operation is resolved against the current file contents before
//! anything is written, so a patch either applies completely or leaves the
//! workspace untouched.

use super::ToolContext;
use super::workspace::Workspace;
use patchpilot_domain::{
    ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult, ToolResultMetadata,
};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Tool name constant
pub const APPLY_PATCH: &str = "apply_patch";

const BEGIN: &str = "*** Begin Patch";
const END: &str = "*** End Patch";
const ADD: &str = "*** Add File: ";
const DELETE: &str = "*** Delete File: ";
const UPDATE: &str = "*** Update File: ";
const END_OF_FILE: &str = "*** End of File";

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("malformed patch: {0}")]
    Parse(String),

    #[error("context mismatch in {path}: {detail}")]
    InvalidContext { path: String, detail: String },

    #[error("path escapes the workspace root: {0}")]
    PathEscape(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl PatchError {
    fn context(path: &str, detail: impl Into<String>) -> Self {
        PatchError::InvalidContext {
            path: path.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<PatchError> for ToolError {
    fn from(err: PatchError) -> Self {
        match &err {
            PatchError::Parse(_) => ToolError::invalid_argument(err.to_string()),
            PatchError::InvalidContext { .. } => ToolError::invalid_context(err.to_string()),
            PatchError::PathEscape(path) => ToolError::path_escape(path.clone()),
            PatchError::Io { .. } => ToolError::execution_failed(err.to_string()),
        }
    }
}

/// One file operation of a parsed patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    Add { path: String, content: String },
    Delete { path: String },
    Update { path: String, hunks: Vec<Hunk> },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Delete { path } | PatchOp::Update { path, .. } => {
                path
            }
        }
    }

    fn marker(&self) -> char {
        match self {
            PatchOp::Add { .. } => 'A',
            PatchOp::Delete { .. } => 'D',
            PatchOp::Update { .. } => 'M',
        }
    }
}

/// A contiguous replacement inside an updated file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    /// Text after `@@`, used to locate the hunk
    pub anchor: Option<String>,
    /// Context and removed lines, in file order
    pub old: Vec<String>,
    /// Context and added lines, in file order
    pub new: Vec<String>,
}

impl Hunk {
    fn is_empty(&self) -> bool {
        self.anchor.is_none() && self.old.is_empty() && self.new.is_empty()
    }
}

pub fn apply_patch_definition() -> ToolDefinition {
    ToolDefinition::new(
        APPLY_PATCH,
        "Apply a multi-file patch. Format: '*** Begin Patch', then per file '*** Add File: \
         <path>' (lines prefixed '+'), '*** Delete File: <path>', or '*** Update File: <path>' \
         followed by hunks ('@@ <anchor>' optional; ' ' context, '-' removed, '+' added), then \
         '*** End Patch'. Context must match the file exactly; nothing is written unless every \
         hunk matches.",
    )
    .with_parameter(ToolParameter::new("patch", "The full patch text", true))
}

pub fn execute_apply_patch(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let text = match call.require_string("patch") {
        Ok(t) => t,
        Err(e) => return ToolResult::failure(APPLY_PATCH, ToolError::invalid_argument(e)),
    };

    match apply_patch(&ctx.workspace, text) {
        Ok(summary) => {
            let files = summary.len();
            ToolResult::success(APPLY_PATCH, format!("APPLIED patch:\n{}", summary.join("\n")))
                .with_metadata(ToolResultMetadata {
                    match_count: Some(files),
                    ..Default::default()
                })
        }
        Err(e) => ToolResult::failure(APPLY_PATCH, e.into()),
    }
}

/// Parse and apply `text`. Returns one `A|M|D path` line per operation.
pub fn apply_patch(workspace: &Workspace, text: &str) -> Result<Vec<String>, PatchError> {
    let ops = parse_patch(text)?;

    // Resolve everything first; `None` content means delete.
    let mut staged: Vec<(PathBuf, Option<String>)> = Vec::new();
    for op in &ops {
        let target = workspace
            .resolve_relative(op.path())
            .map_err(|_| PatchError::PathEscape(op.path().to_string()))?;
        let current = staged_content(&staged, &target, op.path())?;

        let next = match op {
            PatchOp::Add { path, content } => {
                if current.is_some() {
                    return Err(PatchError::context(path, "file already exists"));
                }
                Some(content.clone())
            }
            PatchOp::Delete { path } => {
                if current.is_none() {
                    return Err(PatchError::context(path, "file does not exist"));
                }
                None
            }
            PatchOp::Update { path, hunks } => {
                let Some(current) = current else {
                    return Err(PatchError::context(path, "file does not exist"));
                };
                Some(apply_hunks(path, &current, hunks)?)
            }
        };

        staged.retain(|(p, _)| p != &target);
        staged.push((target, next));
    }

    for (target, content) in &staged {
        let display = workspace.display(target);
        let io_err = |source| PatchError::Io {
            path: display.clone(),
            source,
        };
        match content {
            Some(content) => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(io_err)?;
                }
                fs::write(target, content).map_err(io_err)?;
            }
            None => {
                if target.exists() {
                    fs::remove_file(target).map_err(io_err)?;
                }
            }
        }
    }

    Ok(ops
        .iter()
        .map(|op| format!("{} {}", op.marker(), op.path()))
        .collect())
}

fn staged_content(
    staged: &[(PathBuf, Option<String>)],
    target: &PathBuf,
    display: &str,
) -> Result<Option<String>, PatchError> {
    if let Some((_, content)) = staged.iter().find(|(p, _)| p == target) {
        return Ok(content.clone());
    }
    match fs::read_to_string(target) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PatchError::Io {
            path: display.to_string(),
            source,
        }),
    }
}

/// Parse the envelope into file operations.
pub fn parse_patch(text: &str) -> Result<Vec<PatchOp>, PatchError> {
    let lines: Vec<&str> = text.trim().lines().collect();
    match (lines.first(), lines.last()) {
        (Some(first), Some(last)) if first.trim() == BEGIN && last.trim() == END => {}
        _ => {
            return Err(PatchError::Parse(format!(
                "patch must start with '{}' and end with '{}'",
                BEGIN, END
            )));
        }
    }

    let body = &lines[1..lines.len() - 1];
    let mut ops = Vec::new();
    let mut i = 0;
    while i < body.len() {
        let line = body[i];
        if let Some(path) = line.strip_prefix(ADD) {
            let path = parse_path(path)?;
            let mut content = String::new();
            i += 1;
            while i < body.len() && !body[i].starts_with("*** ") {
                let Some(added) = body[i].strip_prefix('+') else {
                    return Err(PatchError::Parse(format!(
                        "line in added file {} must start with '+': {:?}",
                        path, body[i]
                    )));
                };
                content.push_str(added);
                content.push('\n');
                i += 1;
            }
            ops.push(PatchOp::Add { path, content });
        } else if let Some(path) = line.strip_prefix(DELETE) {
            ops.push(PatchOp::Delete {
                path: parse_path(path)?,
            });
            i += 1;
        } else if let Some(path) = line.strip_prefix(UPDATE) {
            let path = parse_path(path)?;
            let mut hunks = Vec::new();
            let mut hunk = Hunk::default();
            i += 1;
            while i < body.len() && !is_file_header(body[i]) {
                let line = body[i];
                if line.trim() == END_OF_FILE {
                    // allowed as the last line of a file section
                } else if let Some(anchor) = line.strip_prefix("@@") {
                    if !hunk.is_empty() {
                        hunks.push(std::mem::take(&mut hunk));
                    }
                    let anchor = anchor.trim();
                    hunk.anchor = (!anchor.is_empty()).then(|| anchor.to_string());
                } else if let Some(removed) = line.strip_prefix('-') {
                    hunk.old.push(removed.to_string());
                } else if let Some(added) = line.strip_prefix('+') {
                    hunk.new.push(added.to_string());
                } else if let Some(context) = line.strip_prefix(' ') {
                    hunk.old.push(context.to_string());
                    hunk.new.push(context.to_string());
                } else if line.is_empty() {
                    hunk.old.push(String::new());
                    hunk.new.push(String::new());
                } else {
                    return Err(PatchError::Parse(format!(
                        "unexpected line in update of {}: {:?}",
                        path, line
                    )));
                }
                i += 1;
            }
            if !hunk.is_empty() {
                hunks.push(hunk);
            }
            if hunks.is_empty() {
                return Err(PatchError::Parse(format!("update of {} has no hunks", path)));
            }
            ops.push(PatchOp::Update { path, hunks });
        } else if line.trim().is_empty() {
            i += 1;
        } else {
            return Err(PatchError::Parse(format!("unexpected line: {:?}", line)));
        }
    }

    if ops.is_empty() {
        return Err(PatchError::Parse("patch contains no file operations".into()));
    }
    Ok(ops)
}

fn is_file_header(line: &str) -> bool {
    line.starts_with(ADD) || line.starts_with(DELETE) || line.starts_with(UPDATE)
}

fn parse_path(raw: &str) -> Result<String, PatchError> {
    let path = raw.trim();
    if path.is_empty() {
        return Err(PatchError::Parse("missing file path".into()));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(PatchError::PathEscape(path.to_string()));
    }
    Ok(path.to_string())
}

/// Apply hunks in order; each is searched for after the previous one.
fn apply_hunks(path: &str, content: &str, hunks: &[Hunk]) -> Result<String, PatchError> {
    let trailing_newline = content.is_empty() || content.ends_with('\n');
    let line_ending = line_ending(content);
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let mut cursor = 0;

    for hunk in hunks {
        let mut start = cursor;
        if let Some(anchor) = &hunk.anchor {
            let found = lines[cursor..]
                .iter()
                .position(|l| l.trim() == anchor.trim() || l.contains(anchor.as_str()));
            let Some(offset) = found else {
                return Err(PatchError::context(
                    path,
                    format!("anchor not found: {:?}", anchor),
                ));
            };
            start = cursor + offset + 1;
        }

        let at = if hunk.old.is_empty() {
            if hunk.anchor.is_some() { start } else { lines.len() }
        } else {
            locate(path, &lines, start, &hunk.old)?
        };

        lines.splice(at..at + hunk.old.len(), hunk.new.iter().cloned());
        cursor = at + hunk.new.len();
    }

    let mut out = lines.join(line_ending);
    if trailing_newline && !out.is_empty() {
        out.push_str(line_ending);
    }
    Ok(out)
}

/// Line ending of the first line; files without one are written with `\n`.
fn line_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(pos) if content[..pos].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Find the unique position at or after `start` where `old` matches.
fn locate(path: &str, lines: &[String], start: usize, old: &[String]) -> Result<usize, PatchError> {
    let positions: Vec<usize> = (start..=lines.len().saturating_sub(old.len()))
        .filter(|&p| p + old.len() <= lines.len() && lines[p..p + old.len()] == *old)
        .collect();

    match positions.as_slice() {
        [p] => Ok(*p),
        [] => {
            let first_unmatched = first_unmatched_line(lines, start, old);
            Err(PatchError::context(
                path,
                format!("no exact match; first unmatched line: {:?}", first_unmatched),
            ))
        }
        many => Err(PatchError::context(
            path,
            format!(
                "hunk matches {} places (first at line {}); add more context",
                many.len(),
                many[0] + 1
            ),
        )),
    }
}

/// The first hunk line that breaks the best partial match.
fn first_unmatched_line<'a>(lines: &[String], start: usize, old: &'a [String]) -> &'a str {
    let mut best = 0;
    for p in start..lines.len() {
        let matched = old
            .iter()
            .zip(&lines[p..])
            .take_while(|(want, have)| want == have)
            .count();
        best = best.max(matched);
    }
    old.get(best).map(String::as_str).unwrap_or("")
}
