//! Per-run configuration handed to every stage of a chain.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;
use crate::ids::{ClientId, FileId};

/// Processing strategy a client has selected for its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    /// Pass rows through untouched.
    Default,
    /// Clear competitor web-cache URLs before export.
    CleanUrls,
    /// Keep only rows listed in a task and enrich them from the retail directory.
    TaskBasedFilter,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::Default, Self::CleanUrls, Self::TaskBasedFilter];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::CleanUrls => "CLEAN_URLS",
            Self::TaskBasedFilter => "TASK_BASED_FILTER",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Default => "Export data without additional processing",
            Self::CleanUrls => "Clear competitor URLs before export",
            Self::TaskBasedFilter => "Filter rows by task and enrich them with reference data",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownStrategy(s.to_string()))
    }
}

/// The client a run is performed for, as seen by the strategy registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub id: ClientId,
    pub name: Option<String>,
    pub strategy: Option<StrategyKind>,
}

impl ClientIdentity {
    pub fn new(id: u64) -> Self {
        Self {
            id: ClientId(id),
            name: None,
            strategy: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Immutable configuration for one processing run.
///
/// Exclusion lists are populated once per run from an external config source
/// and read by stages from here, never from process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub client: ClientIdentity,
    /// Strategy-specific parameters (e.g. `taskNumber`, `maxDate`, `competitors`).
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    /// Competitor domains whose data must be redacted.
    #[serde(default)]
    pub excluded_competitors: Vec<String>,
    /// File record this run belongs to; used to poll for cancellation.
    #[serde(default)]
    pub file_id: Option<FileId>,
}

impl RunConfiguration {
    pub fn new(client: ClientIdentity) -> Self {
        Self {
            client,
            parameters: BTreeMap::new(),
            excluded_competitors: Vec::new(),
            file_id: None,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_excluded_competitors<I, S>(mut self, competitors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_competitors = competitors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_file_id(mut self, file_id: FileId) -> Self {
        self.file_id = Some(file_id);
        self
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        self.client.strategy
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Scalar parameter rendered as text; empty strings count as absent.
    pub fn parameter_text(&self, key: &str) -> Option<String> {
        let text = match self.parameters.get(key)? {
            Value::String(value) => value.trim().to_string(),
            Value::Number(value) => value.to_string(),
            Value::Bool(value) => value.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}
