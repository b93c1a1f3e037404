//! Plan entities

use serde::{Deserialize, Serialize};

/// A single step of a plan (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Identifier, unique within the plan
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub rationale: String,
    /// One-way: once true, stays true
    #[serde(default)]
    pub completed: bool,
    /// Blocked by external factors rather than completed
    #[serde(default)]
    pub stuck: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub in_progress: bool,
    /// Position in creation order
    #[serde(default)]
    pub order: usize,
}

impl Step {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            rationale: String::new(),
            completed: false,
            stuck: false,
            in_progress: false,
            order: 0,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Neither completed nor stuck.
    pub fn is_actionable(&self) -> bool {
        !self.completed && !self.stuck
    }

    pub fn status_str(&self) -> &'static str {
        if self.completed {
            "completed"
        } else if self.stuck {
            "stuck"
        } else if self.in_progress {
            "in_progress"
        } else {
            "pending"
        }
    }
}

/// Input shape for creating a step, as supplied by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDraft {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub rationale: String,
}

impl StepDraft {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            rationale: String::new(),
        }
    }
}

/// An ordered sequence of steps (Entity)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn get(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    pub fn stuck_count(&self) -> usize {
        self.steps.iter().filter(|s| s.stuck).count()
    }

    /// Fraction of steps marked stuck (0.0 for an empty plan).
    pub fn stuck_ratio(&self) -> f64 {
        if self.steps.is_empty() {
            0.0
        } else {
            self.stuck_count() as f64 / self.steps.len() as f64
        }
    }

    /// First step in creation order that is neither completed nor stuck.
    pub fn next_actionable(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.is_actionable())
    }

    /// Ids of steps that are neither completed nor stuck.
    pub fn incomplete_ids(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.is_actionable())
            .map(|s| s.id.clone())
            .collect()
    }

    /// Render the plan as a checklist for the model.
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(|s| {
                let mark = match s.status_str() {
                    "completed" => "[x]",
                    "stuck" => "[!]",
                    "in_progress" => "[>]",
                    _ => "[ ]",
                };
                format!("{} {}: {}", mark, s.id, s.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
