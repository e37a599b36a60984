//! Relevance ordering for retrieved memories

use std::cmp::Ordering;

use crate::embedding::cosine_similarity;
use crate::types::{MemoryRecord, MemoryView};

fn usable_embedding(record: &MemoryRecord) -> Option<&[f32]> {
    record.embedding.as_deref().filter(|e| !e.is_empty())
}

/// Order `records` best first and keep the top `limit`.
///
/// With a query embedding, relevance is the cosine similarity for records
/// that carry an embedding and the importance for those that do not.
/// Without one, records are ordered by importance and carry no relevance.
/// Equal scores fall back to id order.
pub fn rank(records: Vec<MemoryRecord>, query: Option<&[f32]>, limit: usize) -> Vec<MemoryView> {
    let mut scored: Vec<(f32, Option<f32>, MemoryRecord)> = records
        .into_iter()
        .map(|record| match query {
            Some(query) => {
                let relevance = usable_embedding(&record)
                    .map(|e| cosine_similarity(query, e))
                    .unwrap_or(record.importance);
                (relevance, Some(relevance), record)
            }
            None => (record.importance, None, record),
        })
        .collect();

    scored.sort_by(|(a, _, ra), (b, _, rb)| {
        b.partial_cmp(a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| ra.id.cmp(&rb.id))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, relevance_score, record)| MemoryView {
            id: record.id,
            content: record.content,
            memory_type: record.memory_type,
            importance: record.importance,
            relevance_score,
        })
        .collect()
}
