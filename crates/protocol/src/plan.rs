use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw user input to the query endpoint, before intent analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: None,
            offset: None,
        }
    }
}

/// Filter field, one of the slugged predicate kinds the intent analyzer
/// can detect (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Opening,
    EcoRange,
    Phase,
    Theme,
    Result,
}

/// A single `(field, value)` predicate. Value is always a slug (lowercase,
/// `_`-joined) or, for `eco_range`, a `"A00-E99"`-shaped range string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Filter {
    pub field: FilterField,
    pub value: String,
}

impl Filter {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Rating bounds extracted from the question text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating_delta: Option<u32>,
}

impl Rating {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.white_min.is_none() && self.black_min.is_none() && self.max_rating_delta.is_none()
    }
}

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

/// Structured query plan derived deterministically from free text.
/// Immutable once built; see `chessmate-intent` for the construction
/// algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub cleaned_text: String,
    pub keywords: Vec<String>,
    pub filters: Vec<Filter>,
    pub rating: Rating,
    pub limit: usize,
    pub offset: usize,
}

impl QueryPlan {
    /// Build a plan with a deduplicated, sorted filter set and clamped
    /// limit/offset, as spec.md §3's invariant requires ("filter set has
    /// no duplicates under `(field,value)`").
    #[must_use]
    pub fn new(
        cleaned_text: String,
        keywords: Vec<String>,
        mut filters: Vec<Filter>,
        rating: Rating,
        limit: usize,
        offset: usize,
    ) -> Self {
        let mut seen: BTreeSet<(FilterField, String)> = BTreeSet::new();
        filters.retain(|f| seen.insert((f.field, f.value.clone())));

        Self {
            cleaned_text,
            keywords,
            filters,
            rating,
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
        }
    }

    #[must_use]
    pub fn filter_values(&self, field: FilterField) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .filter(move |f| f.field == field)
            .map(|f| f.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_filters_on_field_and_value() {
        let plan = QueryPlan::new(
            "x".into(),
            vec![],
            vec![
                Filter::new(FilterField::Opening, "french_defense"),
                Filter::new(FilterField::Opening, "french_defense"),
                Filter::new(FilterField::Phase, "endgame"),
            ],
            Rating::default(),
            50,
            0,
        );
        assert_eq!(plan.filters.len(), 2);
    }

    #[test]
    fn clamps_limit_to_bounds() {
        let low = QueryPlan::new("x".into(), vec![], vec![], Rating::default(), 0, 0);
        assert_eq!(low.limit, 1);

        let high = QueryPlan::new("x".into(), vec![], vec![], Rating::default(), 10_000, 0);
        assert_eq!(high.limit, MAX_LIMIT);
    }
}
