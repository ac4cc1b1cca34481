//! The transformation stage abstraction.

use zoomos_model::{ParameterDescriptor, Row, RunConfiguration};

use crate::aggregator::StatisticsAggregator;
use crate::error::StageFailure;

/// A single data-mutating step of a stage chain.
///
/// Stages receive the rows produced by the previous stage and return the rows
/// for the next one. Row-level problems are recorded on the aggregator and
/// processing continues; only structural failures are returned as errors.
///
/// # Example
///
/// ```ignore
/// struct UppercaseNames;
///
/// impl TransformationStage for UppercaseNames {
///     fn name(&self) -> &str {
///         "uppercase-names"
///     }
///
///     fn apply(
///         &self,
///         mut rows: Vec<Row>,
///         _config: &RunConfiguration,
///         stats: &StatisticsAggregator,
///     ) -> Result<Vec<Row>, StageFailure> {
///         for row in &mut rows {
///             if let Some(name) = row.get_mut("name") {
///                 *name = name.to_uppercase();
///                 stats.increment_success();
///             }
///         }
///         Ok(rows)
///     }
/// }
/// ```
pub trait TransformationStage: Send + Sync {
    /// Stable identifier used in logs and error messages.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether this stage applies to the run. Skipped stages record nothing.
    fn supports(&self, _config: &RunConfiguration) -> bool {
        true
    }

    /// Parameters this stage reads from [`RunConfiguration::parameters`].
    fn parameter_descriptors(&self) -> Vec<ParameterDescriptor> {
        Vec::new()
    }

    /// Columns the input rows must carry for this stage to run.
    fn required_columns(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Check the run's parameters against [`Self::parameter_descriptors`].
    fn validate_parameters(&self, config: &RunConfiguration) -> Result<(), String> {
        self.parameter_descriptors()
            .iter()
            .try_for_each(|descriptor| descriptor.validate(config.parameter(&descriptor.key)))
    }

    fn apply(
        &self,
        rows: Vec<Row>,
        config: &RunConfiguration,
        stats: &StatisticsAggregator,
    ) -> Result<Vec<Row>, StageFailure>;
}
