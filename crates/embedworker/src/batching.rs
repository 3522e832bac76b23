/// One claimed job's text keyed by job id, the unit the batching step
/// groups into embedding requests.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub job_id: i64,
    pub text: String,
}

/// Groups claimed jobs into embedding-request-sized batches bounded by
/// `max_batch_count` and `max_chars_per_request` (spec.md §4.7 step 3).
/// A single item whose own text exceeds `max_chars_per_request` still
/// forms its own one-item batch rather than being dropped or split
/// mid-FEN, since the provider's character budget is a batching
/// concern, not a truncation one.
#[must_use]
pub fn split_into_batches(items: Vec<BatchItem>, max_batch_count: usize, max_chars_per_request: usize) -> Vec<Vec<BatchItem>> {
    let mut batches = Vec::new();
    let mut current: Vec<BatchItem> = Vec::new();
    let mut current_chars = 0usize;

    for item in items {
        let item_chars = item.text.chars().count();
        let would_overflow_count = current.len() >= max_batch_count.max(1);
        let would_overflow_chars = !current.is_empty() && current_chars + item_chars > max_chars_per_request;

        if would_overflow_count || would_overflow_chars {
            batches.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        current_chars += item_chars;
        current.push(item);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
