//! Per-entity cost aggregation.
//!
//! This module walks the transfer records and main-thread tasks once each,
//! charges every item to the entity that owns it, and accumulates transfer
//! bytes and main-thread time per entity.

use crate::attribution::{attributable_url, javascript_urls};
use crate::entities::{safe_entity_for_url, EntityResolver};
use crate::models::{Entity, EntityId, EntityStats, ExecutionTask, TransferRecord};
use std::collections::HashMap;
use tracing::{debug, info};

/// Attribution result: totals per entity, keyed by entity id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    stats: HashMap<EntityId, EntityStats>,
    entities: HashMap<EntityId, Entity>,
}

impl Aggregate {
    /// Get the stats slot for an entity, creating a zeroed one if needed.
    fn entry(&mut self, entity: &Entity) -> &mut EntityStats {
        if !self.entities.contains_key(&entity.id) {
            self.entities.insert(entity.id.clone(), entity.clone());
        }
        self.stats.entry(entity.id.clone()).or_default()
    }

    /// Number of entities with at least one attributed record or task.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Totals for one entity.
    pub fn get(&self, id: &EntityId) -> Option<&EntityStats> {
        self.stats.get(id)
    }

    /// Display details for one entity.
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Iterate over every entity and its totals, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Entity, &EntityStats)> {
        self.stats
            .iter()
            .filter_map(|(id, stats)| self.entities.get(id).map(|entity| (entity, stats)))
    }
}

/// Counts of what an aggregation pass did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationCounts {
    pub records_attributed: usize,
    pub records_skipped: usize,
    pub tasks_attributed: usize,
    pub tasks_skipped: usize,
}

/// Charges transfer records and tasks to entities.
pub struct AttributionAggregator<'a> {
    resolver: &'a dyn EntityResolver,
}

impl<'a> AttributionAggregator<'a> {
    pub fn new(resolver: &'a dyn EntityResolver) -> Self {
        Self { resolver }
    }

    /// Build the aggregate for one audit run.
    ///
    /// `cpu_multiplier` scales every task's self time and never applies to
    /// transfer bytes. Items that cannot be attributed are skipped.
    pub fn aggregate(
        &self,
        records: &[TransferRecord],
        tasks: &[ExecutionTask],
        cpu_multiplier: f64,
    ) -> Aggregate {
        self.aggregate_with_counts(records, tasks, cpu_multiplier).0
    }

    /// Same as [`aggregate`](Self::aggregate), also reporting how many items
    /// were attributed or skipped.
    pub fn aggregate_with_counts(
        &self,
        records: &[TransferRecord],
        tasks: &[ExecutionTask],
        cpu_multiplier: f64,
    ) -> (Aggregate, AggregationCounts) {
        let mut aggregate = Aggregate::default();
        let mut counts = AggregationCounts::default();

        for record in records {
            match safe_entity_for_url(self.resolver, &record.url) {
                Some(entity) => {
                    let stats = aggregate.entry(entity);
                    stats.transfer_size = stats.transfer_size.saturating_add(record.transfer_size);
                    counts.records_attributed += 1;
                }
                None => counts.records_skipped += 1,
            }
        }

        let script_urls = javascript_urls(records);

        for task in tasks {
            let entity = attributable_url(task, &script_urls)
                .and_then(|url| safe_entity_for_url(self.resolver, url));

            match entity {
                Some(entity) => {
                    aggregate.entry(entity).main_thread_time += task.self_time * cpu_multiplier;
                    counts.tasks_attributed += 1;
                }
                None => counts.tasks_skipped += 1,
            }
        }

        debug!(?counts, "Attribution pass finished");
        info!(
            entities = aggregate.len(),
            records = records.len(),
            tasks = tasks.len(),
            cpu_multiplier,
            "Aggregated third-party cost"
        );

        (aggregate, counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LookupError;

    /// Resolves `https://<host>/...` by host, treating everything else as invalid.
    struct FakeResolver {
        entities: HashMap<&'static str, Entity>,
    }

    impl FakeResolver {
        fn new() -> Self {
            let mut entities = HashMap::new();
            entities.insert("ads.test", Entity::new("Ad Network", None));
            entities.insert(
                "cdn.ads.test",
                Entity::new("Ad Network", Some("https://ads.test".to_string())),
            );
            entities.insert(
                "widgets.test",
                Entity::new("Widgets", Some("https://widgets.test".to_string())),
            );
            Self { entities }
        }
    }

    impl EntityResolver for FakeResolver {
        fn entity_for_url(&self, url: &str) -> Result<Option<&Entity>, LookupError> {
            let host = url
                .strip_prefix("https://")
                .and_then(|rest| rest.split('/').next())
                .ok_or_else(|| LookupError::MissingHost(url.to_string()))?;
            Ok(self.entities.get(host))
        }
    }

    fn ad_network() -> EntityId {
        EntityId::from_name("Ad Network")
    }

    #[test]
    fn test_empty_input() {
        let resolver = FakeResolver::new();
        let aggregate = AttributionAggregator::new(&resolver).aggregate(&[], &[], 1.0);
        assert!(aggregate.is_empty());
    }

    #[test]
    fn test_unresolvable_record_skipped() {
        let resolver = FakeResolver::new();
        let records = vec![
            TransferRecord::new("not a url", 500),
            TransferRecord::new("https://first-party.test/index.html", 900),
        ];
        let (aggregate, counts) =
            AttributionAggregator::new(&resolver).aggregate_with_counts(&records, &[], 1.0);

        assert!(aggregate.is_empty());
        assert_eq!(counts.records_skipped, 2);
        assert_eq!(counts.records_attributed, 0);
    }

    #[test]
    fn test_records_and_tasks_merge() {
        let resolver = FakeResolver::new();
        let records = vec![
            TransferRecord::script("https://ads.test/a.js", 100),
            TransferRecord::script("https://cdn.ads.test/b.js", 200),
        ];
        let tasks = vec![ExecutionTask::new(
            50.0,
            vec!["https://ads.test/a.js".to_string()],
        )];

        let aggregate = AttributionAggregator::new(&resolver).aggregate(&records, &tasks, 1.0);

        assert_eq!(aggregate.len(), 1);
        let stats = aggregate.get(&ad_network()).unwrap();
        assert_eq!(stats.transfer_size, 300);
        assert_eq!(stats.main_thread_time, 50.0);

        // The side table keeps the first entity seen for an id.
        assert_eq!(aggregate.entity(&ad_network()).unwrap().homepage, None);
    }

    #[test]
    fn test_cpu_multiplier_scales_time_only() {
        let resolver = FakeResolver::new();
        let records = vec![TransferRecord::script("https://widgets.test/w.js", 1000)];
        let tasks = vec![ExecutionTask::new(
            100.0,
            vec!["https://widgets.test/w.js".to_string()],
        )];
        let id = EntityId::from_name("Widgets");

        let unthrottled = AttributionAggregator::new(&resolver).aggregate(&records, &tasks, 1.0);
        assert_eq!(unthrottled.get(&id).unwrap().main_thread_time, 100.0);

        let throttled = AttributionAggregator::new(&resolver).aggregate(&records, &tasks, 4.0);
        let stats = throttled.get(&id).unwrap();
        assert_eq!(stats.main_thread_time, 400.0);
        assert_eq!(stats.transfer_size, 1000);
    }

    #[test]
    fn test_task_without_url_skipped() {
        let resolver = FakeResolver::new();
        let tasks = vec![
            ExecutionTask::new(30.0, vec![]),
            ExecutionTask {
                name: "MinorGC".to_string(),
                self_time: 5.0,
                attributable_urls: vec![],
            },
            ExecutionTask::new(20.0, vec!["https://widgets.test/w.js".to_string()]),
        ];

        let (aggregate, counts) =
            AttributionAggregator::new(&resolver).aggregate_with_counts(&[], &tasks, 1.0);

        assert_eq!(aggregate.len(), 1);
        assert_eq!(counts.tasks_attributed, 1);
        assert_eq!(counts.tasks_skipped, 2);
    }

    #[test]
    fn test_transfer_size_saturates() {
        let resolver = FakeResolver::new();
        let records = vec![
            TransferRecord::new("https://ads.test/huge", u64::MAX),
            TransferRecord::new("https://cdn.ads.test/pixel", 1),
        ];
        let aggregate = AttributionAggregator::new(&resolver).aggregate(&records, &[], 1.0);
        assert_eq!(aggregate.get(&ad_network()).unwrap().transfer_size, u64::MAX);
    }

    #[test]
    fn test_task_only_entity_has_zero_bytes() {
        let resolver = FakeResolver::new();
        let tasks = vec![ExecutionTask::new(
            12.5,
            vec!["https://widgets.test/inline".to_string()],
        )];
        let aggregate = AttributionAggregator::new(&resolver).aggregate(&[], &tasks, 2.0);
        let stats = aggregate.get(&EntityId::from_name("Widgets")).unwrap();
        assert_eq!(stats.transfer_size, 0);
        assert_eq!(stats.main_thread_time, 25.0);
    }
}
