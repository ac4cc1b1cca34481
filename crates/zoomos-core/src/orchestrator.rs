//! Processing run orchestration.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span, warn};
use zoomos_model::{ProcessingStats, ResultEnvelope, Row, RunConfiguration, RunOutcome};

use crate::aggregator::StatisticsAggregator;
use crate::cancel::{CancellationFlag, CancellationRegistry};
use crate::chain::StageChain;
use crate::error::PipelineError;
use crate::export::{self, EXPORT_FORMAT_PARAM};
use crate::registry::StrategyRegistry;

/// Runs one file's rows through the chain resolved for its client.
///
/// The orchestrator never fails: every problem ends up in the returned
/// envelope's outcome and error list.
pub struct Orchestrator {
    registry: Arc<StrategyRegistry>,
    cancellations: Arc<CancellationRegistry>,
}

impl Orchestrator {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self::with_cancellations(registry, Arc::new(CancellationRegistry::new()))
    }

    pub fn with_cancellations(
        registry: Arc<StrategyRegistry>,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            registry,
            cancellations,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn cancellations(&self) -> &Arc<CancellationRegistry> {
        &self.cancellations
    }

    /// Validate, resolve, execute and time one run.
    pub fn run(&self, rows: Vec<Row>, config: &RunConfiguration) -> ResultEnvelope {
        let span = info_span!(
            "run",
            client_id = %config.client.id,
            file_id = ?config.file_id.map(|id| id.0)
        );
        let _guard = span.enter();

        if rows.is_empty() {
            warn!("rejecting run: input contains no rows");
            return ResultEnvelope::rejected(vec!["input contains no rows".to_string()]);
        }

        let chain = self.registry.resolve(&config.client);
        let missing = missing_columns(&chain, &rows, config);
        if !missing.is_empty() {
            warn!(chain = %chain.name(), missing = ?missing, "rejecting run: required columns absent");
            return ResultEnvelope::rejected(
                missing
                    .into_iter()
                    .map(|column| format!("missing required column '{column}'"))
                    .collect(),
            );
        }

        if let Err(err) = validate_configuration(&chain, config) {
            warn!(chain = %chain.name(), error = %err, "configuration rejected");
            let outcome = RunOutcome::Failed {
                message: err.to_string(),
            };
            return ResultEnvelope::from_run(ProcessingStats::default(), outcome, chain.name());
        }

        let cancel = config
            .file_id
            .map(|id| self.cancellations.flag(id))
            .unwrap_or_default();
        self.execute(&chain, rows, config, &cancel)
    }

    fn execute(
        &self,
        chain: &StageChain,
        rows: Vec<Row>,
        config: &RunConfiguration,
        cancel: &CancellationFlag,
    ) -> ResultEnvelope {
        let start = Instant::now();
        let input_rows = rows.len();
        let stats = StatisticsAggregator::new();
        stats.add_total(input_rows as u64);

        let (outcome, rows) = match chain.execute(rows, config, &stats, cancel) {
            Ok(rows) => (RunOutcome::Completed, rows),
            Err(err) if err.is_cancelled() => {
                info!(chain = %chain.name(), "run cancelled");
                (RunOutcome::Cancelled, Vec::new())
            }
            Err(err) => {
                warn!(chain = %chain.name(), error = %err, "run failed");
                let outcome = RunOutcome::Failed {
                    message: err.to_string(),
                };
                (outcome, Vec::new())
            }
        };

        let stats = stats.finish(start.elapsed(), rows);
        let mut envelope = ResultEnvelope::from_run(stats, outcome, chain.name());
        if envelope.outcome == RunOutcome::Completed && export::csv_requested(config) {
            match export::csv_artifact(config, chain.name(), &envelope.rows) {
                Ok(artifact) => envelope = envelope.with_artifact(artifact),
                Err(err) => {
                    warn!(error = %err, "export failed");
                    envelope.success = false;
                    envelope.errors.push(err.to_string());
                    envelope.outcome = RunOutcome::Failed {
                        message: err.to_string(),
                    };
                }
            }
        }

        info!(
            chain = %chain.name(),
            input_rows,
            output_rows = envelope.rows.len(),
            success_count = envelope.stats.success_count,
            error_count = envelope.stats.error_count,
            duration_ms = start.elapsed().as_millis(),
            "run complete"
        );
        envelope
    }
}

fn missing_columns(chain: &StageChain, rows: &[Row], config: &RunConfiguration) -> Vec<String> {
    chain
        .required_columns(config)
        .into_iter()
        .filter(|column| !rows.iter().any(|row| row.contains_key(*column)))
        .map(str::to_string)
        .collect()
}

fn validate_configuration(
    chain: &StageChain,
    config: &RunConfiguration,
) -> Result<(), PipelineError> {
    export::export_format_descriptor()
        .validate(config.parameter(EXPORT_FORMAT_PARAM))
        .map_err(|message| PipelineError::Configuration {
            stage: "export".to_string(),
            message,
        })?;
    chain.validate_parameters(config)
}
