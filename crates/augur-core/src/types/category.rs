//! Activity categories and the free-text action mapper.
//!
//! Journal entries carry free-text action labels ("Sleep", "Homework",
//! "internship 2026"). The classifier works over a small closed set of
//! semantic categories, so every label is folded into one of the buckets
//! below via case-insensitive keyword matching.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Closed set of activity categories.
///
/// Declaration order is the category priority order: `categorize` returns
/// the first category whose keyword list matches, and probability ties are
/// broken by this order. The order is chosen so that every listed keyword
/// maps back to its own category (e.g. Study precedes Work because
/// "homework" contains "work"). `Other` is the catch-all and never matches
/// by keyword.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Category {
    /// Sleep, naps, rest.
    Sleep,
    /// Homework, classes, research.
    Study,
    /// Workouts, gym, fitness.
    Exercise,
    /// Job search, networking, internships.
    Career,
    /// Job, office, meetings.
    Work,
    /// Friends and family time.
    Social,
    /// Chores, meals, personal upkeep.
    Personal,
    /// Gaming, watching, leisure.
    Entertainment,
    /// Meditation and reflection.
    Mindfulness,
    /// Catch-all for unmatched actions.
    Other,
}

/// Keyword lists per category, as captured from real journal labels.
/// Matching is case-insensitive substring containment.
const KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Sleep, &["Sleep", "nap", "sleeping", "rest"]),
    (
        Category::Study,
        &["Homework", "study", "School", "class", "learning", "research"],
    ),
    (
        Category::Exercise,
        &["Workout", "exercise", "gym", "running", "fitness"],
    ),
    (
        Category::Career,
        &["internship 2026", "career", "job search", "networking", "resume"],
    ),
    (Category::Work, &["Work", "job", "office", "meeting"]),
    (
        Category::Social,
        &["Friends and family", "social", "friends", "family", "hanging out"],
    ),
    (
        Category::Personal,
        &["Duties", "personal", "chores", "shower", "eating", "cooking"],
    ),
    (
        Category::Entertainment,
        &["Waste", "entertainment", "gaming", "watching", "fun"],
    ),
    (
        Category::Mindfulness,
        &["Meditate REAL", "meditation", "mindfulness", "reflection"],
    ),
];

/// Lowercased match table, built once.
static MATCH_TABLE: Lazy<Vec<(Category, Vec<String>)>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .map(|(category, words)| {
            (
                *category,
                words.iter().map(|w| w.to_lowercase()).collect(),
            )
        })
        .collect()
});

impl Category {
    /// Number of categories, including `Other`.
    pub const COUNT: usize = 10;

    /// All categories in priority order.
    pub fn all() -> Vec<Category> {
        Self::iter().collect()
    }

    /// All category names in priority order, as static strings.
    pub fn all_names() -> Vec<&'static str> {
        Self::iter().map(|c| c.into()).collect()
    }

    /// Position of this category in the fixed ordering.
    ///
    /// Used to index probability vectors and one-hot encodings; the
    /// ordering must not change while a classifier instance is live.
    pub fn index(self) -> usize {
        Self::iter().position(|c| c == self).expect("category is in the set")
    }

    /// Category at the given index, if in range.
    pub fn from_index(i: usize) -> Option<Category> {
        Self::iter().nth(i)
    }

    /// Map a free-text action label to its category.
    ///
    /// Case-insensitively tests the label against each category's keywords
    /// in priority order; the first category with a substring match wins.
    /// Total and deterministic: unmatched labels fall through to `Other`.
    pub fn categorize(action: &str) -> Category {
        let action_lower = action.to_lowercase();
        for (category, keywords) in MATCH_TABLE.iter() {
            if keywords.iter().any(|k| action_lower.contains(k.as_str())) {
                return *category;
            }
        }
        Category::Other
    }

    /// The keyword list for this category (empty for `Other`).
    pub fn keywords(self) -> &'static [&'static str] {
        KEYWORDS
            .iter()
            .find(|(c, _)| *c == self)
            .map(|(_, words)| *words)
            .unwrap_or(&[])
    }
}
