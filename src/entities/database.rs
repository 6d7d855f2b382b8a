//! JSON-backed entity database.
//!
//! The database is a list of entities, each claiming a set of domains:
//!
//! ```json
//! [{"name": "Google Analytics", "homepage": "https://...", "domains": ["*.google-analytics.com"]}]
//! ```
//!
//! A plain domain matches that exact host. A `*.` domain matches the bare
//! domain and every subdomain of it.

use super::{EntityResolver, LookupError};
use crate::models::Entity;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use url::Url;

// Compiled into the binary so the tool works without a database file.
const DEFAULT_DATABASE: &str = include_str!("../../data/entities.json");

/// Errors produced while building an entity database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to read entity database {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse entity database: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("entity '{0}' is defined more than once")]
    DuplicateEntity(String),

    #[error("domain '{domain}' is claimed by both '{first}' and '{second}'")]
    DuplicateDomain {
        domain: String,
        first: String,
        second: String,
    },

    #[error("entity '{0}' has an empty name or domain")]
    Empty(String),
}

#[derive(Debug, Deserialize)]
struct EntityRecord {
    name: String,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    domains: Vec<String>,
}

/// In-memory entity knowledge base.
#[derive(Debug, Default)]
pub struct EntityDatabase {
    entities: Vec<Entity>,
    exact: HashMap<String, usize>,
    wildcard: HashMap<String, usize>,
}

impl EntityDatabase {
    /// Load the database compiled into the binary.
    pub fn embedded() -> Result<Self, DatabaseError> {
        Self::from_json(DEFAULT_DATABASE)
    }

    /// Load a database from a JSON file.
    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let content = std::fs::read_to_string(path).map_err(|source| DatabaseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let db = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            entities = db.len(),
            "Loaded entity database"
        );
        Ok(db)
    }

    /// Parse a database from JSON text.
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        let records: Vec<EntityRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    fn from_records(records: Vec<EntityRecord>) -> Result<Self, DatabaseError> {
        let mut db = Self::default();
        let mut ids = HashSet::new();

        for record in records {
            let name = record.name.trim();
            if name.is_empty() {
                return Err(DatabaseError::Empty(record.name));
            }

            let entity = Entity::new(name, record.homepage);
            if entity.id.as_str().is_empty() {
                return Err(DatabaseError::Empty(entity.name));
            }
            if !ids.insert(entity.id.clone()) {
                return Err(DatabaseError::DuplicateEntity(entity.name));
            }

            let index = db.entities.len();
            for domain in &record.domains {
                let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
                let (table, key) = if domain.starts_with("*.") {
                    (&mut db.wildcard, domain[2..].to_string())
                } else {
                    (&mut db.exact, domain)
                };
                if key.is_empty() {
                    return Err(DatabaseError::Empty(entity.name));
                }
                if let Some(&first) = table.get(&key) {
                    return Err(DatabaseError::DuplicateDomain {
                        domain: key,
                        first: db.entities[first].name.clone(),
                        second: entity.name,
                    });
                }
                table.insert(key, index);
            }

            db.entities.push(entity);
        }

        Ok(db)
    }

    /// Number of entities in the database.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Find the entity owning a normalized (lowercase, no trailing dot) host.
    fn lookup_host(&self, host: &str) -> Option<&Entity> {
        if let Some(&index) = self.exact.get(host) {
            return Some(&self.entities[index]);
        }

        let mut candidate = host;
        loop {
            if let Some(&index) = self.wildcard.get(candidate) {
                return Some(&self.entities[index]);
            }
            match candidate.find('.') {
                Some(dot) => candidate = &candidate[dot + 1..],
                None => return None,
            }
        }
    }
}

impl EntityResolver for EntityDatabase {
    fn entity_for_url(&self, url: &str) -> Result<Option<&Entity>, LookupError> {
        let parsed = Url::parse(url).map_err(|source| LookupError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| LookupError::MissingHost(url.to_string()))?;
        let host = host.trim_end_matches('.').to_ascii_lowercase();

        Ok(self.lookup_host(&host))
    }
}
