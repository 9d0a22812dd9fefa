//! Theme queries: positive/negative prototype phrases for a theme.

use serde::{Deserialize, Serialize};

/// A prototype phrase with an optional weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePrototype {
    pub text: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl ThemePrototype {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: 1.0,
        }
    }
}

/// A theme with its positive and negative prototype sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeQuery {
    pub theme: String,
    #[serde(default)]
    pub positives: Vec<ThemePrototype>,
    #[serde(default)]
    pub negatives: Vec<ThemePrototype>,
}

impl ThemeQuery {
    /// Build a query from keyword lists.
    ///
    /// Phrases are trimmed and deduplicated; when both lists come out empty
    /// the theme name itself becomes the single positive prototype.
    pub fn from_keywords(
        theme: impl Into<String>,
        positives: &[String],
        negatives: &[String],
    ) -> Self {
        let theme = theme.into();
        let mut positives = clean_list(positives);
        let negatives = clean_list(negatives);
        if positives.is_empty() && negatives.is_empty() {
            positives.push(theme.clone());
        }
        Self {
            theme,
            positives: positives.into_iter().map(ThemePrototype::new).collect(),
            negatives: negatives.into_iter().map(ThemePrototype::new).collect(),
        }
    }

    pub fn positive_texts(&self) -> Vec<String> {
        self.positives.iter().map(|p| p.text.clone()).collect()
    }

    pub fn negative_texts(&self) -> Vec<String> {
        self.negatives.iter().map(|p| p.text.clone()).collect()
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut cleaned = Vec::new();
    for value in values {
        let text = value.trim();
        if text.is_empty() || !seen.insert(text.to_string()) {
            continue;
        }
        cleaned.push(text.to_string());
    }
    cleaned
}
