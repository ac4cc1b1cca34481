//! JSON configuration file and its merge with command-line overrides.
//!
//! ```json
//! {
//!   "competitors": ["auchan.ru", "lenta.com"],
//!   "parameters": { "exportFormat": "csv" },
//!   "clients": {
//!     "42": { "name": "acme", "strategy": "TASK_BASED_FILTER", "parameters": { "taskNumber": "T-1" } }
//!   },
//!   "tasks": { "T-1": ["RET01", "RET02"] },
//!   "retailDirectory": {
//!     "RET01": { "retailName": "Retail One", "regionName": "North", "physicalAddress": "1 Main St" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use zoomos_core::{InMemoryReferenceDirectory, RetailEntry};
use zoomos_model::{ClientIdentity, RunConfiguration, StrategyKind};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    /// Competitors redacted for every client unless overridden.
    #[serde(default)]
    pub competitors: Vec<String>,
    /// Parameters applied to every run.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub clients: BTreeMap<u64, ClientConfig>,
    /// Task number to retail codes.
    #[serde(default)]
    pub tasks: BTreeMap<String, Vec<String>>,
    /// Retail code to directory entry.
    #[serde(default)]
    pub retail_directory: BTreeMap<String, RetailEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientConfig {
    pub name: Option<String>,
    pub strategy: Option<StrategyKind>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub competitors: Vec<String>,
}

/// Values given on the command line; each wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub client_id: u64,
    pub client_name: Option<String>,
    pub strategy: Option<StrategyKind>,
    pub parameters: Vec<(String, Value)>,
    pub competitors: Vec<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Load `path` when given, otherwise start from an empty configuration.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn reference_directory(&self) -> InMemoryReferenceDirectory {
        let directory = self
            .tasks
            .iter()
            .fold(InMemoryReferenceDirectory::new(), |directory, (task, codes)| {
                directory.with_task(task.as_str(), codes)
            });
        self.retail_directory
            .iter()
            .fold(directory, |directory, (code, entry)| {
                directory.with_retail_entry(code, entry.clone())
            })
    }

    /// Run configuration for one client.
    ///
    /// Parameters layer as file defaults, then client parameters, then
    /// command-line values. Competitors and strategy take the first
    /// non-empty source among command line, client entry and file defaults.
    pub fn run_configuration(&self, overrides: &RunOverrides) -> RunConfiguration {
        let client_config = self.clients.get(&overrides.client_id);

        let mut client = ClientIdentity::new(overrides.client_id);
        client.name = overrides
            .client_name
            .clone()
            .or_else(|| client_config.and_then(|config| config.name.clone()));
        client.strategy = overrides
            .strategy
            .or_else(|| client_config.and_then(|config| config.strategy));

        let mut config = RunConfiguration::new(client);
        config.parameters = self.parameters.clone();
        if let Some(client_config) = client_config {
            config.parameters.extend(client_config.parameters.clone());
        }
        config
            .parameters
            .extend(overrides.parameters.iter().cloned());

        config.excluded_competitors = [
            overrides.competitors.as_slice(),
            client_config.map_or(&[][..], |config| config.competitors.as_slice()),
            self.competitors.as_slice(),
        ]
        .into_iter()
        .find(|list| !list.is_empty())
        .map(<[String]>::to_vec)
        .unwrap_or_default();
        config
    }
}

/// Parse a `key=value` pair. Values that are valid JSON (numbers, booleans,
/// arrays) keep their type; anything else is taken as a string.
pub fn parse_parameter(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected key=value, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("parameter name is empty in '{raw}'");
    }
    let value = value.trim();
    let value = serde_json::from_str::<Value>(value)
        .ok()
        .filter(|parsed| !parsed.is_string() && !parsed.is_object())
        .unwrap_or_else(|| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
