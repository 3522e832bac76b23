use chessmate_protocol::{Filter, FilterField, QueryPlan};
use std::collections::HashMap;

/// Structured predicate sent to the vector store alongside the query
/// vector (spec.md §4.6 step 2). ECO ranges are excluded — the relational
/// fetch already applies them, and Qdrant-shaped payload filters only
/// match exact/enum-like fields, not numeric ranges over a code string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFilter {
    pub must: HashMap<&'static str, Vec<String>>,
    pub min_white_rating: Option<u32>,
    pub min_black_rating: Option<u32>,
}

#[must_use]
pub fn build_payload_filter(plan: &QueryPlan) -> PayloadFilter {
    let mut must: HashMap<&'static str, Vec<String>> = HashMap::new();
    for filter in &plan.filters {
        let key = match filter.field {
            FilterField::Opening => "opening_slug",
            FilterField::Phase => "phase",
            FilterField::Theme => "theme",
            FilterField::Result => "result",
            FilterField::EcoRange => continue,
        };
        must.entry(key).or_default().push(filter.value.clone());
    }

    PayloadFilter {
        must,
        min_white_rating: plan.rating.white_min,
        min_black_rating: plan.rating.black_min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessmate_protocol::Rating;

    #[test]
    fn excludes_eco_range_but_keeps_other_fields() {
        let plan = QueryPlan::new(
            "x".into(),
            vec![],
            vec![
                Filter::new(FilterField::EcoRange, "B20-B99"),
                Filter::new(FilterField::Theme, "sacrifice"),
            ],
            Rating {
                white_min: Some(2400),
                black_min: None,
                max_rating_delta: None,
            },
            50,
            0,
        );
        let payload = build_payload_filter(&plan);
        assert!(!payload.must.contains_key("eco_range"));
        assert_eq!(payload.must.get("theme"), Some(&vec!["sacrifice".to_string()]));
        assert_eq!(payload.min_white_rating, Some(2400));
    }
}
