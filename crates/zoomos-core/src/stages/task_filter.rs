use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;
use zoomos_model::{
    BATCH_SIZE_DATA_SAVE, ParameterDescriptor, ParameterKind, Row, RunConfiguration, StrategyKind,
};

use crate::aggregator::StatisticsAggregator;
use crate::error::StageFailure;
use crate::reference::{ReferenceDirectory, RetailEntry, normalize_code};
use crate::stage::TransformationStage;

pub const TASK_NUMBER_PARAM: &str = "taskNumber";
pub const MAX_DATE_PARAM: &str = "maxDate";

pub const COMPETITOR_ADDITIONAL: &str = "competitordata.competitorAdditional";
pub const COMPETITOR_DATE: &str = "competitordata.competitorDate";
pub const COMPETITOR_LOCAL_DATE_TIME: &str = "competitordata.competitorLocalDateTime";
pub const COMPETITOR_NAME: &str = "competitordata.competitorName";
pub const REGION: &str = "regiondata.region";
pub const REGION_ADDRESS: &str = "regiondata.regionAddress";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Keeps only rows whose retail code is listed in a task, clamps their dates
/// and enriches them from the retail network directory.
///
/// Rows are split into fixed-size batches filtered on scoped threads that
/// share the run's aggregator. Output order equals input order.
pub struct TaskFilterStage {
    directory: Arc<dyn ReferenceDirectory>,
    batch_size: usize,
}

impl TaskFilterStage {
    pub fn new(directory: Arc<dyn ReferenceDirectory>) -> Self {
        Self {
            directory,
            batch_size: BATCH_SIZE_DATA_SAVE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

struct BatchContext<'a> {
    keys: &'a HashSet<String>,
    directory: &'a HashMap<String, RetailEntry>,
    max_date: Option<NaiveDate>,
    stats: &'a StatisticsAggregator,
}

impl TransformationStage for TaskFilterStage {
    fn name(&self) -> &str {
        "task-filter"
    }

    fn description(&self) -> &str {
        "Filter rows by task and enrich them with reference data"
    }

    fn supports(&self, config: &RunConfiguration) -> bool {
        config.strategy() == Some(StrategyKind::TaskBasedFilter)
            || config.parameter(TASK_NUMBER_PARAM).is_some()
    }

    fn parameter_descriptors(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new(TASK_NUMBER_PARAM, "Task number", ParameterKind::String)
                .with_description("Task whose retail codes select the rows to keep")
                .required(),
            ParameterDescriptor::new(MAX_DATE_PARAM, "Max date", ParameterKind::Date)
                .with_description("Latest allowed data date (YYYY-MM-DD)"),
        ]
    }

    fn required_columns(&self) -> Vec<&'static str> {
        vec![COMPETITOR_ADDITIONAL]
    }

    fn apply(
        &self,
        rows: Vec<Row>,
        config: &RunConfiguration,
        stats: &StatisticsAggregator,
    ) -> Result<Vec<Row>, StageFailure> {
        let task_number = config.parameter_text(TASK_NUMBER_PARAM).ok_or_else(|| {
            StageFailure::Configuration(format!("'{TASK_NUMBER_PARAM}' is required"))
        })?;
        let max_date = config
            .parameter_text(MAX_DATE_PARAM)
            .map(|text| {
                NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|err| {
                    StageFailure::Configuration(format!("invalid '{MAX_DATE_PARAM}' {text}: {err}"))
                })
            })
            .transpose()?;

        let keys = self.directory.task_keys(&task_number)?;
        let codes: HashSet<String> = rows
            .iter()
            .filter_map(|row| row.get(COMPETITOR_ADDITIONAL))
            .map(|code| normalize_code(code))
            .filter(|code| !code.is_empty())
            .collect();
        let directory = self.directory.retail_entries(&codes)?;

        let input_rows = rows.len();
        let context = BatchContext {
            keys: &keys,
            directory: &directory,
            max_date,
            stats,
        };
        let kept = self.filter_in_batches(rows, &context)?;

        stats.set_additional_stat(TASK_NUMBER_PARAM, task_number.as_str());
        stats.set_additional_stat("taskKeys", keys.len());
        stats.set_additional_stat("filteredOutRows", input_rows - kept.len());
        info!(
            task_number = %task_number,
            task_keys = keys.len(),
            directory_entries = directory.len(),
            input_rows,
            kept_rows = kept.len(),
            "task filter complete"
        );
        Ok(kept)
    }
}

impl TaskFilterStage {
    fn filter_in_batches(
        &self,
        rows: Vec<Row>,
        context: &BatchContext<'_>,
    ) -> Result<Vec<Row>, StageFailure> {
        let mut output = Vec::with_capacity(rows.len());
        let mut batches = Vec::new();
        let mut offset = 0;
        let mut remaining = rows.into_iter();
        loop {
            let batch: Vec<Row> = remaining.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let len = batch.len();
            batches.push((offset, batch));
            offset += len;
        }

        let workers = num_cpus::get().max(1);
        let mut pending = batches.into_iter().peekable();
        while pending.peek().is_some() {
            let wave: Vec<(usize, Vec<Row>)> = pending.by_ref().take(workers).collect();
            let results = thread::scope(|scope| {
                let handles: Vec<_> = wave
                    .into_iter()
                    .map(|(offset, batch)| {
                        let end = offset + batch.len();
                        let handle = scope.spawn(move || filter_batch(offset, batch, context));
                        (offset, end, handle)
                    })
                    .collect();
                // Join every worker before inspecting results so none is left running.
                let joined: Vec<_> = handles
                    .into_iter()
                    .map(|(start, end, handle)| {
                        handle
                            .join()
                            .map_err(|_| StageFailure::WorkerPanicked { start, end })
                    })
                    .collect();
                joined.into_iter().collect::<Result<Vec<_>, _>>()
            })?;
            for kept in results {
                output.extend(kept);
            }
        }
        Ok(output)
    }
}

fn filter_batch(offset: usize, batch: Vec<Row>, context: &BatchContext<'_>) -> Vec<Row> {
    let mut kept = Vec::new();
    for (position, mut row) in batch.into_iter().enumerate() {
        let key = row
            .get(COMPETITOR_ADDITIONAL)
            .map(|code| normalize_code(code))
            .unwrap_or_default();
        if key.is_empty() || !context.keys.contains(&key) {
            continue;
        }
        if let Some(max_date) = context.max_date
            && let Err(message) = clamp_date(&mut row, max_date)
        {
            context
                .stats
                .record_row_error(offset + position, &message, "date_parse");
        }
        if let Some(entry) = context.directory.get(&key) {
            row.insert(COMPETITOR_NAME.to_string(), entry.retail_name.clone());
            row.insert(REGION.to_string(), entry.region_name.clone());
            row.insert(REGION_ADDRESS.to_string(), entry.physical_address.clone());
        }
        kept.push(row);
    }
    context.stats.increment_success_by(kept.len() as u64);
    kept
}

/// Replace a date later than `max_date` with `max_date`, keeping the time of
/// the companion date-time column when it parses.
fn clamp_date(row: &mut Row, max_date: NaiveDate) -> Result<(), String> {
    let Some(raw) = row.get(COMPETITOR_DATE) else {
        return Ok(());
    };
    let text = raw.trim();
    if text.is_empty() {
        return Ok(());
    }
    let date = NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|err| format!("invalid {COMPETITOR_DATE} '{text}': {err}"))?;
    if date <= max_date {
        return Ok(());
    }
    row.insert(
        COMPETITOR_DATE.to_string(),
        max_date.format(DATE_FORMAT).to_string(),
    );
    if let Some(raw) = row.get(COMPETITOR_LOCAL_DATE_TIME) {
        let text = raw.trim();
        let parsed = DATE_TIME_FORMATS.iter().find_map(|format| {
            NaiveDateTime::parse_from_str(text, format)
                .ok()
                .map(|value| (value, *format))
        });
        if let Some((value, format)) = parsed {
            let clamped = max_date.and_time(value.time()).format(format).to_string();
            row.insert(COMPETITOR_LOCAL_DATE_TIME.to_string(), clamped);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoomos_model::row_from_pairs;

    fn max() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn later_dates_are_clamped_with_time_kept() {
        let mut row = row_from_pairs([
            (COMPETITOR_DATE, "2024-03-15"),
            (COMPETITOR_LOCAL_DATE_TIME, "2024-03-15T08:30:00"),
        ]);
        clamp_date(&mut row, max()).unwrap();
        assert_eq!(row[COMPETITOR_DATE], "2024-03-10");
        assert_eq!(row[COMPETITOR_LOCAL_DATE_TIME], "2024-03-10T08:30:00");
    }

    #[test]
    fn earlier_and_blank_dates_are_untouched() {
        let mut row = row_from_pairs([(COMPETITOR_DATE, "2024-03-01")]);
        clamp_date(&mut row, max()).unwrap();
        assert_eq!(row[COMPETITOR_DATE], "2024-03-01");

        let mut blank = row_from_pairs([(COMPETITOR_DATE, " ")]);
        assert!(clamp_date(&mut blank, max()).is_ok());
    }

    #[test]
    fn unparseable_date_is_reported() {
        let mut row = row_from_pairs([(COMPETITOR_DATE, "15.03.2024")]);
        let message = clamp_date(&mut row, max()).unwrap_err();
        assert!(message.contains("15.03.2024"));
        assert_eq!(row[COMPETITOR_DATE], "15.03.2024");
    }
}
