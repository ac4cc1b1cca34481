//! Reference data consumed by the task filter: task key sets and the retail
//! network directory.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Directory entry used to enrich rows of a retail network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailEntry {
    pub retail_name: String,
    pub region_name: String,
    pub physical_address: String,
}

pub trait ReferenceDirectory: Send + Sync {
    /// Normalized (trimmed, upper-cased) retail codes listed in a task.
    fn task_keys(&self, task_number: &str) -> Result<HashSet<String>, LookupError>;

    /// Directory entries for the given normalized retail codes. Unknown codes are absent.
    fn retail_entries(
        &self,
        codes: &HashSet<String>,
    ) -> Result<HashMap<String, RetailEntry>, LookupError>;
}

/// Normalize a retail code the way task keys are stored.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Reference directory backed by in-process maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceDirectory {
    tasks: HashMap<String, HashSet<String>>,
    retail: HashMap<String, RetailEntry>,
}

impl InMemoryReferenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task<I, S>(mut self, task_number: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = codes
            .into_iter()
            .map(|code| normalize_code(code.as_ref()))
            .collect();
        self.tasks.insert(task_number.into().trim().to_string(), keys);
        self
    }

    pub fn with_retail_entry(mut self, code: &str, entry: RetailEntry) -> Self {
        self.retail.insert(normalize_code(code), entry);
        self
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn retail_count(&self) -> usize {
        self.retail.len()
    }
}

impl ReferenceDirectory for InMemoryReferenceDirectory {
    fn task_keys(&self, task_number: &str) -> Result<HashSet<String>, LookupError> {
        self.tasks
            .get(task_number.trim())
            .cloned()
            .ok_or_else(|| LookupError::TaskNotFound(task_number.to_string()))
    }

    fn retail_entries(
        &self,
        codes: &HashSet<String>,
    ) -> Result<HashMap<String, RetailEntry>, LookupError> {
        Ok(codes
            .iter()
            .filter_map(|code| {
                self.retail
                    .get(code)
                    .map(|entry| (code.clone(), entry.clone()))
            })
            .collect())
    }
}
