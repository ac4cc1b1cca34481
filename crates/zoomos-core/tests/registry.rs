use std::sync::Arc;

use zoomos_core::stages::PassThroughStage;
use zoomos_core::{InMemoryReferenceDirectory, StageChain, StrategyRegistry, build_default_registry};
use zoomos_model::{ClientId, ClientIdentity, StrategyKind};

fn registry() -> StrategyRegistry {
    build_default_registry(Arc::new(InMemoryReferenceDirectory::new()))
}

#[test]
fn client_one_resolves_to_redaction_chain() {
    let chain = registry().resolve(&ClientIdentity::new(1));
    assert_eq!(chain.name(), "competitor-redaction");
    assert_eq!(chain.stage_names(), vec!["web-cache-url-redaction"]);
}

#[test]
fn unknown_client_resolves_to_default_chain() {
    let chain = registry().resolve(&ClientIdentity::new(999));
    assert_eq!(chain.name(), "default");
    assert_eq!(chain.stage_names(), vec!["pass-through"]);
}

#[test]
fn strategy_selects_chain_when_no_client_binding() {
    let registry = registry();
    let clean = registry.resolve(&ClientIdentity::new(7).with_strategy(StrategyKind::CleanUrls));
    let task =
        registry.resolve(&ClientIdentity::new(7).with_strategy(StrategyKind::TaskBasedFilter));
    let default = registry.resolve(&ClientIdentity::new(7).with_strategy(StrategyKind::Default));

    assert_eq!(clean.name(), "clean-urls");
    assert_eq!(task.name(), "task-filter");
    assert_eq!(default.name(), "default");
}

#[test]
fn client_binding_wins_over_strategy() {
    let chain =
        registry().resolve(&ClientIdentity::new(1).with_strategy(StrategyKind::TaskBasedFilter));
    assert_eq!(chain.name(), "competitor-redaction");
}

#[test]
fn first_matching_predicate_wins() {
    let mut registry = StrategyRegistry::default();
    registry.register_when(
        "named acme",
        |client| client.name.as_deref() == Some("acme"),
        StageChain::new("first").add_stage(Box::new(PassThroughStage)),
    );
    registry.register_when(
        "any named",
        |client| client.name.is_some(),
        StageChain::new("second"),
    );

    let acme = registry.resolve(&ClientIdentity::new(3).with_name("acme"));
    let other = registry.resolve(&ClientIdentity::new(3).with_name("other"));

    assert_eq!(acme.name(), "first");
    assert_eq!(other.name(), "second");
    assert_eq!(registry.len(), 2);
}

#[test]
fn bindings_list_every_route() {
    let mut registry = registry();
    registry.register_client(ClientId(12), StageChain::new("custom"));
    let listing: Vec<String> = registry
        .bindings()
        .into_iter()
        .map(|binding| format!("{} => {}", binding.binding, binding.chain))
        .collect();

    insta::assert_snapshot!(
        listing.join(" | "),
        @"client 1 => competitor-redaction | client 12 => custom | strategy CLEAN_URLS => clean-urls | strategy TASK_BASED_FILTER => task-filter | fallback => default"
    );
}

#[test]
fn bindings_report_chain_parameters() {
    let bindings = registry().bindings();
    let task = bindings
        .iter()
        .find(|binding| binding.chain == "task-filter")
        .unwrap();
    assert_eq!(task.parameters, vec!["taskNumber*", "maxDate"]);
    let fallback = bindings.last().unwrap();
    assert_eq!(fallback.binding, "fallback");
    assert!(fallback.parameters.is_empty());
}
