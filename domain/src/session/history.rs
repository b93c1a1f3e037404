//! Bounded conversation history
//!
//! [`ConversationHistory`] holds the ordered messages of one phase and keeps
//! them under a character budget. Compaction only ever removes whole
//! messages, oldest first, and never touches:
//!
//! - protected messages (the system message), or
//! - the tail (the newest `keep_last` messages; one message when unlimited).
//!
//! After compaction either the total size fits the budget or only protected
//! and tail messages remain.

use super::entities::Message;
use serde::{Deserialize, Serialize};

/// Smallest tail compaction ever preserves.
pub const MIN_TAIL: usize = 1;

/// How many of the newest messages compaction must keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepLast {
    /// Only the character budget constrains; just the minimum tail is kept.
    Unlimited,
    /// Keep the newest `n` messages regardless of budget.
    Last(usize),
}

impl KeepLast {
    /// Convert the configuration value (`-1` = unlimited).
    pub fn from_config(value: i64) -> Self {
        if value < 0 {
            KeepLast::Unlimited
        } else {
            KeepLast::Last(value as usize)
        }
    }

    fn tail_len(&self) -> usize {
        match self {
            KeepLast::Unlimited => MIN_TAIL,
            KeepLast::Last(n) => (*n).max(MIN_TAIL),
        }
    }
}

/// Compaction budget applied after every append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryBudget {
    pub max_chars: usize,
    pub keep_last: KeepLast,
}

impl HistoryBudget {
    pub fn new(max_chars: usize, keep_last: KeepLast) -> Self {
        Self {
            max_chars,
            keep_last,
        }
    }

    /// A budget that never evicts anything.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, KeepLast::Unlimited)
    }
}

impl Default for HistoryBudget {
    fn default() -> Self {
        Self::new(100_000, KeepLast::Last(40))
    }
}

/// One record of a persisted transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Append(Message),
    Evict { indices: Vec<u64> },
}

/// Ordered, compacting conversation history for one phase run.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    budget: HistoryBudget,
    next_index: u64,
    evicted_total: usize,
}

impl ConversationHistory {
    pub fn new(budget: HistoryBudget) -> Self {
        Self {
            messages: Vec::new(),
            budget,
            next_index: 0,
            evicted_total: 0,
        }
    }

    /// Rebuild a history from transcript entries.
    ///
    /// Entries are applied verbatim (no compaction runs during replay), so
    /// the result holds exactly the messages that were retained when the
    /// transcript was written.
    pub fn from_transcript(
        budget: HistoryBudget,
        entries: impl IntoIterator<Item = TranscriptEntry>,
    ) -> Self {
        let mut history = Self::new(budget);
        for entry in entries {
            match entry {
                TranscriptEntry::Append(message) => {
                    history.next_index = history.next_index.max(message.index + 1);
                    history.messages.push(message);
                }
                TranscriptEntry::Evict { indices } => {
                    let before = history.messages.len();
                    history.messages.retain(|m| !indices.contains(&m.index));
                    history.evicted_total += before - history.messages.len();
                }
            }
        }
        history
    }

    /// Append a message, assign its sequence index, and compact.
    ///
    /// Returns the appended message's index and the indices evicted by the
    /// compaction this append triggered.
    pub fn append(&mut self, mut message: Message) -> (u64, Vec<u64>) {
        let index = self.next_index;
        self.next_index += 1;
        message.index = index;
        self.messages.push(message);

        let budget = self.budget;
        let evicted = if self.total_chars() > budget.max_chars {
            self.compact(budget.max_chars, budget.keep_last)
        } else {
            Vec::new()
        };
        (index, evicted)
    }

    /// Evict the oldest unprotected messages outside the tail until the
    /// total size fits `budget_chars`. Returns the evicted indices in
    /// eviction order.
    pub fn compact(&mut self, budget_chars: usize, keep_last: KeepLast) -> Vec<u64> {
        let mut total = self.total_chars();
        let mut evicted = Vec::new();

        while total > budget_chars {
            let tail_start = self.messages.len().saturating_sub(keep_last.tail_len());
            let Some(pos) = self.messages[..tail_start]
                .iter()
                .position(|m| !m.is_protected())
            else {
                break;
            };
            let removed = self.messages.remove(pos);
            total -= removed.char_len();
            evicted.push(removed.index);
        }

        self.evicted_total += evicted.len();
        evicted
    }

    /// Read-only view of the retained messages, oldest first.
    pub fn view(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn budget(&self) -> HistoryBudget {
        self.budget
    }

    /// Total character size of the retained messages.
    pub fn total_chars(&self) -> usize {
        self.messages.iter().map(|m| m.char_len()).sum()
    }

    /// Number of messages evicted over the lifetime of this history.
    pub fn evicted_count(&self) -> usize {
        self.evicted_total
    }
}
