//! End-to-end runs through the orchestrator.

use std::sync::Arc;

use serde_json::json;
use zoomos_core::stages::{COMPETITOR_ADDITIONAL, TASK_NUMBER_PARAM};
use zoomos_core::{CancellationRegistry, InMemoryReferenceDirectory, Orchestrator, build_default_registry};
use zoomos_model::{ClientIdentity, FileId, Row, RunConfiguration, RunOutcome, StrategyKind, row_from_pairs};

fn orchestrator() -> Orchestrator {
    let directory = InMemoryReferenceDirectory::new().with_task("T-1", ["RET01"]);
    Orchestrator::new(Arc::new(build_default_registry(Arc::new(directory))))
}

fn url_rows() -> Vec<Row> {
    vec![
        row_from_pairs([("competitorWebCacheUrl", "https://lenta.com/p/1")]),
        row_from_pairs([("competitorWebCacheUrl", "https://shop.example/p/2")]),
    ]
}

#[test]
fn default_chain_run_succeeds() {
    let config = RunConfiguration::new(ClientIdentity::new(999));
    let envelope = orchestrator().run(url_rows(), &config);

    assert!(envelope.success);
    assert_eq!(envelope.outcome, RunOutcome::Completed);
    assert_eq!(envelope.rows, url_rows());
    assert_eq!(envelope.stats.total_count, 2);
    assert_eq!(envelope.stats.success_count, 2);
    assert_eq!(envelope.statistics.get("chain"), Some(&json!("default")));
    assert!(envelope.artifact.is_none());
}

#[test]
fn client_one_run_redacts_default_competitors() {
    let config = RunConfiguration::new(ClientIdentity::new(1));
    let envelope = orchestrator().run(url_rows(), &config);

    assert!(envelope.success);
    assert_eq!(envelope.rows[0]["competitorWebCacheUrl"], "");
    assert_eq!(envelope.rows[1]["competitorWebCacheUrl"], "https://shop.example/p/2");
    assert_eq!(envelope.stats.success_count, 1);
}

#[test]
fn empty_input_is_rejected_without_running() {
    let config = RunConfiguration::new(ClientIdentity::new(1));
    let envelope = orchestrator().run(Vec::new(), &config);

    assert!(!envelope.success);
    assert!(matches!(envelope.outcome, RunOutcome::Rejected { .. }));
    assert!(envelope.rows.is_empty());
    assert_eq!(envelope.stats.total_count, 0);
}

#[test]
fn missing_required_column_is_rejected() {
    let config = RunConfiguration::new(
        ClientIdentity::new(5).with_strategy(StrategyKind::TaskBasedFilter),
    )
    .with_parameter(TASK_NUMBER_PARAM, "T-1");
    let envelope = orchestrator().run(url_rows(), &config);

    assert!(!envelope.success);
    assert_eq!(
        envelope.errors,
        vec![format!("missing required column '{COMPETITOR_ADDITIONAL}'")]
    );
}

#[test]
fn invalid_parameters_fail_before_any_row_is_touched() {
    let config = RunConfiguration::new(
        ClientIdentity::new(5).with_strategy(StrategyKind::TaskBasedFilter),
    );
    let rows = vec![row_from_pairs([(COMPETITOR_ADDITIONAL, "RET01")])];
    let envelope = orchestrator().run(rows, &config);

    assert!(!envelope.success);
    assert!(matches!(envelope.outcome, RunOutcome::Failed { .. }));
    assert!(envelope.rows.is_empty());
    assert_eq!(envelope.stats.success_count, 0);
    assert!(envelope.errors[0].contains("Task number"));
}

#[test]
fn lookup_failure_fails_the_run() {
    let config = RunConfiguration::new(
        ClientIdentity::new(5).with_strategy(StrategyKind::TaskBasedFilter),
    )
    .with_parameter(TASK_NUMBER_PARAM, "T-missing");
    let rows = vec![row_from_pairs([(COMPETITOR_ADDITIONAL, "RET01")])];
    let envelope = orchestrator().run(rows, &config);

    assert!(!envelope.success);
    assert!(matches!(envelope.outcome, RunOutcome::Failed { .. }));
    assert!(envelope.errors[0].contains("T-missing"));
}

#[test]
fn csv_export_is_attached_when_requested() {
    let config = RunConfiguration::new(ClientIdentity::new(1)).with_parameter("exportFormat", "csv");
    let envelope = orchestrator().run(url_rows(), &config);

    let artifact = envelope.artifact.expect("csv artifact");
    assert_eq!(artifact.file_name, "1-competitor-redaction.csv");
    let text = String::from_utf8(artifact.bytes).unwrap();
    insta::assert_snapshot!(text.replace('\n', "|"), @r#"competitorWebCacheUrl|""|https://shop.example/p/2|"#);
}

#[test]
fn unsupported_export_format_is_a_configuration_error() {
    let config = RunConfiguration::new(ClientIdentity::new(1)).with_parameter("exportFormat", "xlsx");
    let envelope = orchestrator().run(url_rows(), &config);

    assert!(matches!(envelope.outcome, RunOutcome::Failed { .. }));
    assert!(envelope.rows.is_empty());
}

#[test]
fn cancelled_file_does_not_run() {
    let cancellations = Arc::new(CancellationRegistry::new());
    let orchestrator = Orchestrator::with_cancellations(
        Arc::new(build_default_registry(Arc::new(InMemoryReferenceDirectory::new()))),
        Arc::clone(&cancellations),
    );
    cancellations.cancel(FileId(9));
    let config = RunConfiguration::new(ClientIdentity::new(1)).with_file_id(FileId(9));

    let envelope = orchestrator.run(url_rows(), &config);

    assert_eq!(envelope.outcome, RunOutcome::Cancelled);
    assert!(!envelope.success);
    assert_eq!(envelope.stats.success_count, 0);
}
