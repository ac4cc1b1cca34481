//! Ordered stage execution.

use std::collections::BTreeSet;

use tracing::{debug, info_span};
use zoomos_model::{ParameterDescriptor, Row, RunConfiguration};

use crate::aggregator::StatisticsAggregator;
use crate::cancel::CancellationFlag;
use crate::error::{PipelineError, Result};
use crate::stage::TransformationStage;

/// An immutable, ordered list of stages.
///
/// Output of stage *i* is the input of stage *i + 1*. Stages whose
/// [`TransformationStage::supports`] returns `false` are skipped.
pub struct StageChain {
    name: String,
    stages: Vec<Box<dyn TransformationStage>>,
}

impl StageChain {
    /// Create an empty chain; an empty chain returns its input unchanged.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Add a stage to the end of the chain.
    pub fn add_stage(mut self, stage: Box<dyn TransformationStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// List stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Parameter descriptors of every stage, in stage order.
    pub fn parameter_descriptors(&self) -> Vec<ParameterDescriptor> {
        self.stages
            .iter()
            .flat_map(|stage| stage.parameter_descriptors())
            .collect()
    }

    fn applicable<'a>(
        &'a self,
        config: &'a RunConfiguration,
    ) -> impl Iterator<Item = &'a dyn TransformationStage> + 'a {
        self.stages
            .iter()
            .map(Box::as_ref)
            .filter(move |stage| stage.supports(config))
    }

    /// Columns required by the stages that apply to `config`.
    pub fn required_columns(&self, config: &RunConfiguration) -> BTreeSet<&'static str> {
        self.applicable(config)
            .flat_map(|stage| stage.required_columns())
            .collect()
    }

    /// Validate the run's parameters against every applicable stage.
    pub fn validate_parameters(&self, config: &RunConfiguration) -> Result<()> {
        for stage in self.applicable(config) {
            stage
                .validate_parameters(config)
                .map_err(|message| PipelineError::Configuration {
                    stage: stage.name().to_string(),
                    message,
                })?;
        }
        Ok(())
    }

    /// Run all applicable stages in order.
    ///
    /// `cancel` is checked before each stage; once raised, no further stage
    /// starts and [`PipelineError::Cancelled`] is returned.
    pub fn execute(
        &self,
        rows: Vec<Row>,
        config: &RunConfiguration,
        stats: &StatisticsAggregator,
        cancel: &CancellationFlag,
    ) -> Result<Vec<Row>> {
        let mut rows = rows;
        for stage in self.applicable(config) {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled {
                    next_stage: stage.name().to_string(),
                });
            }
            let span = info_span!("stage", chain = %self.name, stage = %stage.name());
            let _guard = span.enter();
            let input_rows = rows.len();
            rows = stage
                .apply(rows, config, stats)
                .map_err(|source| PipelineError::Stage {
                    stage: stage.name().to_string(),
                    source,
                })?;
            debug!(
                input_rows,
                output_rows = rows.len(),
                errors = stats.error_count(),
                "stage complete"
            );
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for StageChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageChain")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}
