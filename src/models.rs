//! Data models for the third-party auditor.
//!
//! This module contains the input records consumed by the attribution pass,
//! the entity types produced by the knowledge base, and the rows and totals
//! that make up the final summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource type reported for a network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    #[serde(rename = "XHR")]
    Xhr,
    Fetch,
    #[serde(other)]
    Other,
}

/// A single network fetch, as extracted from the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    /// URL the request was made for.
    pub url: String,
    /// Bytes transferred over the network, headers included.
    #[serde(default)]
    pub transfer_size: u64,
    /// Resource type, when the network log recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
}

impl TransferRecord {
    /// Creates a record with no resource type.
    pub fn new(url: impl Into<String>, transfer_size: u64) -> Self {
        Self {
            url: url.into(),
            transfer_size,
            resource_type: None,
        }
    }

    /// Creates a record for a fetched script.
    pub fn script(url: impl Into<String>, transfer_size: u64) -> Self {
        Self {
            url: url.into(),
            transfer_size,
            resource_type: Some(ResourceType::Script),
        }
    }

    /// Returns true if this record loaded JavaScript.
    pub fn is_script(&self) -> bool {
        self.resource_type == Some(ResourceType::Script)
    }
}

/// A unit of main-thread work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTask {
    /// Trace event name of the task (e.g. `EvaluateScript`).
    #[serde(default)]
    pub name: String,
    /// Time spent in this task excluding its children, in milliseconds.
    pub self_time: f64,
    /// URLs of the scripts on the stack while the task ran, outermost first.
    #[serde(default, rename = "attributableURLs")]
    pub attributable_urls: Vec<String>,
}

impl ExecutionTask {
    pub fn new(self_time: f64, attributable_urls: Vec<String>) -> Self {
        Self {
            name: String::new(),
            self_time,
            attributable_urls,
        }
    }
}

/// Stable identity of a third-party entity. Used as the aggregation key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derives an id from an entity's display name.
    ///
    /// The id is the lowercase name with every run of non-alphanumeric
    /// characters collapsed into a single `-`.
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        for c in name.chars() {
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        Self(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recognized third-party provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Human-readable name (e.g. "Google Analytics").
    pub name: String,
    /// Provider homepage, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, homepage: Option<String>) -> Self {
        let name = name.into();
        Self {
            id: EntityId::from_name(&name),
            name,
            homepage,
        }
    }
}

/// Running totals for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    /// Sum of transfer sizes of all records attributed to the entity.
    pub transfer_size: u64,
    /// Sum of scaled self time of all tasks attributed to the entity, in ms.
    pub main_thread_time: f64,
}

/// One row of the ranked summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRow {
    pub entity_id: EntityId,
    /// Display name of the entity.
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_homepage: Option<String>,
    pub transfer_size: u64,
    pub main_thread_time: f64,
}

impl RankedRow {
    /// Combined impact of this row.
    ///
    /// Treats 1 KiB transferred as roughly equivalent to 1 ms of main-thread
    /// time so rows with very different byte/time ratios can be compared.
    pub fn score(&self) -> f64 {
        self.transfer_size as f64 / 1024.0 + self.main_thread_time
    }
}

/// Grand totals over all attributed entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub wasted_bytes: u64,
    pub wasted_ms: f64,
}

/// Column heading of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableHeading {
    /// Row field the column displays.
    pub key: String,
    /// How the value is rendered (`link`, `bytes`, `ms`).
    pub value_type: String,
    pub label: String,
}

/// Table details attached to the audit result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDetails {
    /// Always `"table"`.
    #[serde(rename = "type")]
    pub details_type: String,
    pub headings: Vec<TableHeading>,
    pub items: Vec<RankedRow>,
    pub summary: Summary,
}

/// Outcome of the third-party summary audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    /// 1 when no third-party cost was attributed, 0 otherwise.
    pub score: f64,
    /// One-line description of the result, empty when nothing was attributed.
    pub display_value: String,
    pub details: TableDetails,
}

/// Metadata about the audit report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Network records input file.
    pub network_file: String,
    /// Main-thread tasks input file.
    pub tasks_file: String,
    /// Number of network records read.
    pub records_analyzed: usize,
    /// Number of main-thread tasks read.
    pub tasks_analyzed: usize,
    /// Factor applied to main-thread task time.
    pub cpu_multiplier: f64,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete third-party report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub metadata: ReportMetadata,
    pub audit: AuditResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_from_name() {
        assert_eq!(
            EntityId::from_name("Google Analytics").as_str(),
            "google-analytics"
        );
        assert_eq!(EntityId::from_name("  Yandex.Metrica! ").as_str(), "yandex-metrica");
        assert_eq!(EntityId::from_name("jsDelivr CDN").as_str(), "jsdelivr-cdn");
    }

    #[test]
    fn test_row_score() {
        let row = RankedRow {
            entity_id: EntityId::from_name("A"),
            entity: "A".to_string(),
            entity_homepage: None,
            transfer_size: 2048,
            main_thread_time: 3.5,
        };
        assert_eq!(row.score(), 5.5);
    }

    #[test]
    fn test_parse_transfer_record() {
        let json = r#"{"url": "https://cdn.example.com/a.js", "transferSize": 1200, "resourceType": "Script"}"#;
        let record: TransferRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.transfer_size, 1200);
        assert!(record.is_script());

        let json = r#"{"url": "https://example.com/", "resourceType": "Ping"}"#;
        let record: TransferRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.transfer_size, 0);
        assert_eq!(record.resource_type, Some(ResourceType::Other));
    }

    #[test]
    fn test_parse_execution_task() {
        let json = r#"{"name": "EvaluateScript", "selfTime": 12.5, "attributableURLs": ["https://a.com/x.js"]}"#;
        let task: ExecutionTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.name, "EvaluateScript");
        assert_eq!(task.self_time, 12.5);
        assert_eq!(task.attributable_urls, vec!["https://a.com/x.js"]);
    }
}
