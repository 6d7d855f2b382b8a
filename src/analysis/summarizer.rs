//! Ranking and grand totals.

use super::aggregator::Aggregate;
use crate::models::{RankedRow, Summary};

/// Turn an aggregate into rows ranked by combined impact, plus totals.
///
/// Rows are sorted by [`RankedRow::score`], highest first. Equal scores are
/// ordered by entity name, then id, so the output does not depend on map
/// iteration order.
pub fn summarize(aggregate: &Aggregate) -> (Vec<RankedRow>, Summary) {
    let mut summary = Summary::default();

    let mut rows: Vec<RankedRow> = aggregate
        .iter()
        .map(|(entity, stats)| {
            summary.wasted_bytes = summary.wasted_bytes.saturating_add(stats.transfer_size);
            summary.wasted_ms += stats.main_thread_time;

            RankedRow {
                entity_id: entity.id.clone(),
                entity: entity.name.clone(),
                entity_homepage: entity.homepage.clone(),
                transfer_size: stats.transfer_size,
                main_thread_time: stats.main_thread_time,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.score()
            .total_cmp(&a.score())
            .then_with(|| a.entity.cmp(&b.entity))
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    (rows, summary)
}

/// Informative pass/fail score: 1 when nothing was attributed, 0 otherwise.
pub fn informative_score(rows: &[RankedRow]) -> f64 {
    if rows.is_empty() {
        1.0
    } else {
        0.0
    }
}
