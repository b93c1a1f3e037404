//! Stuck-marking policy
//!
//! Which steps count as "core implementation" work (and therefore may not
//! be marked stuck) is a policy decision. It is injected into the
//! [`PlanStore`](super::store::PlanStore) as a [`StuckPolicy`].

use super::entities::Step;

/// Classifies steps that must not be marked stuck.
pub trait StuckPolicy: Send + Sync {
    /// Whether `step` is core implementation work.
    fn is_core(&self, step: &Step) -> bool;
}

/// Default core-step keywords.
pub const DEFAULT_CORE_KEYWORDS: &[&str] = &["implement", "create", "build", "develop", "add", "write"];

/// Default keywords that mark a step as legitimately blockable.
pub const DEFAULT_OVERRIDE_KEYWORDS: &[&str] =
    &["test", "lint", "setup", "config", "install", "deploy"];

/// Keyword-based policy.
///
/// A step is core when its description mentions a core keyword and does
/// not contain any override keyword. Core keywords match whole words and
/// their inflections; override keywords match anywhere in the description,
/// so "configuration" and "pytest" both count.
#[derive(Debug, Clone)]
pub struct KeywordStuckPolicy {
    core_keywords: Vec<String>,
    override_keywords: Vec<String>,
}

impl KeywordStuckPolicy {
    pub fn new(
        core_keywords: impl IntoIterator<Item = impl Into<String>>,
        override_keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            core_keywords: core_keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
            override_keywords: override_keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordStuckPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_CORE_KEYWORDS.iter().copied(),
            DEFAULT_OVERRIDE_KEYWORDS.iter().copied(),
        )
    }
}

impl StuckPolicy for KeywordStuckPolicy {
    fn is_core(&self, step: &Step) -> bool {
        let description = step.description.to_lowercase();
        if self.override_keywords.iter().any(|k| description.contains(k.as_str())) {
            return false;
        }
        let words = words(&description);
        self.core_keywords
            .iter()
            .any(|k| words.iter().any(|w| word_matches(w, k)))
    }
}

/// Policy that never classifies a step as core.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllStuckPolicy;

impl StuckPolicy for AllowAllStuckPolicy {
    fn is_core(&self, _step: &Step) -> bool {
        false
    }
}

/// Adapter turning any predicate function into a policy.
pub struct FnStuckPolicy<F>(pub F);

impl<F> StuckPolicy for FnStuckPolicy<F>
where
    F: Fn(&Step) -> bool + Send + Sync,
{
    fn is_core(&self, step: &Step) -> bool {
        (self.0)(step)
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

const SUFFIXES: &[&str] = &["", "e", "s", "es", "d", "ed", "ing", "er", "ers", "ation", "ations"];

/// Whether `word` is an inflection of `keyword` ("writing" ~ "write",
/// "adds" ~ "add", but not "address" ~ "add").
fn word_matches(word: &str, keyword: &str) -> bool {
    let stem = keyword.strip_suffix('e').unwrap_or(keyword);
    word.strip_prefix(stem)
        .is_some_and(|rest| SUFFIXES.contains(&rest))
}
