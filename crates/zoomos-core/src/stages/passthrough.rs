use zoomos_model::{Row, RunConfiguration};

use crate::aggregator::StatisticsAggregator;
use crate::error::StageFailure;
use crate::stage::TransformationStage;

/// Returns its input unchanged, counting every row as a success.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughStage;

impl TransformationStage for PassThroughStage {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn description(&self) -> &str {
        "Export data without additional processing"
    }

    fn apply(
        &self,
        rows: Vec<Row>,
        _config: &RunConfiguration,
        stats: &StatisticsAggregator,
    ) -> Result<Vec<Row>, StageFailure> {
        stats.increment_success_by(rows.len() as u64);
        Ok(rows)
    }
}
