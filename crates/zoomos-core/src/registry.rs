//! Client strategy registry.
//!
//! Maps a client to the stage chain its files run through. Lookup order:
//!
//! 1. a chain bound to the exact client id
//! 2. the first predicate binding (in registration order) that accepts the client
//! 3. the default pass-through chain
//!
//! The registry is populated once at start-up and shared read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use zoomos_model::{ClientId, ClientIdentity, StrategyKind};

use crate::chain::StageChain;
use crate::reference::ReferenceDirectory;
use crate::stages::{CompetitorRedactionStage, PassThroughStage, TaskFilterStage};

type ClientPredicate = Box<dyn Fn(&ClientIdentity) -> bool + Send + Sync>;

struct PredicateBinding {
    label: String,
    predicate: ClientPredicate,
    chain: Arc<StageChain>,
}

/// Description of one registry entry, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBinding {
    pub binding: String,
    pub chain: String,
    pub stages: Vec<String>,
    /// Parameter keys the chain reads; required ones are suffixed with `*`.
    pub parameters: Vec<String>,
}

impl ChainBinding {
    fn describe(binding: String, chain: &StageChain) -> Self {
        Self {
            binding,
            chain: chain.name().to_string(),
            stages: chain.stage_names().into_iter().map(str::to_string).collect(),
            parameters: chain
                .parameter_descriptors()
                .into_iter()
                .map(|descriptor| {
                    if descriptor.required {
                        format!("{}*", descriptor.key)
                    } else {
                        descriptor.key
                    }
                })
                .collect(),
        }
    }
}

pub struct StrategyRegistry {
    by_client: HashMap<ClientId, Arc<StageChain>>,
    predicates: Vec<PredicateBinding>,
    default_chain: Arc<StageChain>,
}

impl StrategyRegistry {
    /// Creates an empty registry resolving everything to `default_chain`.
    pub fn new(default_chain: StageChain) -> Self {
        Self {
            by_client: HashMap::new(),
            predicates: Vec::new(),
            default_chain: Arc::new(default_chain),
        }
    }

    /// Bind a chain to one client id, replacing any previous binding.
    pub fn register_client(&mut self, client: ClientId, chain: StageChain) {
        self.by_client.insert(client, Arc::new(chain));
    }

    /// Bind a chain to every client the predicate accepts.
    pub fn register_when<F>(&mut self, label: impl Into<String>, predicate: F, chain: StageChain)
    where
        F: Fn(&ClientIdentity) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(PredicateBinding {
            label: label.into(),
            predicate: Box::new(predicate),
            chain: Arc::new(chain),
        });
    }

    /// Bind a chain to clients that selected `kind`.
    pub fn register_strategy(&mut self, kind: StrategyKind, chain: StageChain) {
        self.register_when(
            format!("strategy {kind}"),
            move |client| client.strategy == Some(kind),
            chain,
        );
    }

    /// Chain for `client`. Never fails.
    pub fn resolve(&self, client: &ClientIdentity) -> Arc<StageChain> {
        if let Some(chain) = self.by_client.get(&client.id) {
            return Arc::clone(chain);
        }
        self.predicates
            .iter()
            .find(|binding| (binding.predicate)(client))
            .map_or_else(
                || Arc::clone(&self.default_chain),
                |binding| Arc::clone(&binding.chain),
            )
    }

    pub fn default_chain(&self) -> &StageChain {
        &self.default_chain
    }

    /// Client-id bindings sorted by id, then predicate bindings in lookup
    /// order, then the fallback.
    pub fn bindings(&self) -> Vec<ChainBinding> {
        let mut clients: Vec<_> = self.by_client.iter().collect();
        clients.sort_by_key(|(id, _)| **id);
        let mut bindings: Vec<ChainBinding> = clients
            .into_iter()
            .map(|(id, chain)| ChainBinding::describe(format!("client {id}"), chain))
            .collect();
        bindings.extend(
            self.predicates
                .iter()
                .map(|binding| ChainBinding::describe(binding.label.clone(), &binding.chain)),
        );
        bindings.push(ChainBinding::describe(
            "fallback".to_string(),
            &self.default_chain,
        ));
        bindings
    }

    /// Number of explicit bindings (excluding the fallback).
    pub fn len(&self) -> usize {
        self.by_client.len() + self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(default_chain())
    }
}

/// The pass-through chain used when nothing else matches.
pub fn default_chain() -> StageChain {
    StageChain::new("default").add_stage(Box::new(PassThroughStage))
}

/// Registry with the built-in bindings:
///
/// - client `1`: clear `competitorWebCacheUrl` for excluded competitors
/// - `CLEAN_URLS`: clear competitor URLs by competitor name
/// - `TASK_BASED_FILTER`: task filter backed by `directory`
/// - anything else: pass-through
pub fn build_default_registry(directory: Arc<dyn ReferenceDirectory>) -> StrategyRegistry {
    let mut registry = StrategyRegistry::default();
    registry.register_client(
        ClientId(1),
        StageChain::new("competitor-redaction")
            .add_stage(Box::new(CompetitorRedactionStage::web_cache_url())),
    );
    registry.register_strategy(
        StrategyKind::CleanUrls,
        StageChain::new("clean-urls").add_stage(Box::new(CompetitorRedactionStage::clean_urls())),
    );
    registry.register_strategy(
        StrategyKind::TaskBasedFilter,
        StageChain::new("task-filter").add_stage(Box::new(TaskFilterStage::new(directory))),
    );
    registry
}
