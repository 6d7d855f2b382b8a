//! tpaudit - third-party impact summary.
//!
//! Attributes network transfer bytes and main-thread time from a page load to
//! the third-party entities responsible for them, and ranks the entities by
//! combined impact.

pub mod analysis;
pub mod attribution;
pub mod cli;
pub mod config;
pub mod entities;
pub mod loader;
pub mod models;
pub mod report;

use analysis::{summarize, AttributionAggregator};
use entities::EntityResolver;
use models::{AuditResult, ExecutionTask, TransferRecord};

/// Run attribution, ranking and assembly over already-loaded inputs.
pub fn third_party_summary(
    records: &[TransferRecord],
    tasks: &[ExecutionTask],
    cpu_multiplier: f64,
    resolver: &dyn EntityResolver,
) -> AuditResult {
    let aggregate = AttributionAggregator::new(resolver).aggregate(records, tasks, cpu_multiplier);
    let (rows, summary) = summarize(&aggregate);
    report::assemble_audit(rows, summary)
}
