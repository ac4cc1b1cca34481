//! Built-in transformation stages.

mod passthrough;
mod redaction;
mod task_filter;

pub use passthrough::PassThroughStage;
pub use redaction::{
    COMPETITORS_PARAM, CompetitorRedactionStage, DEFAULT_COMPETITORS, resolve_competitors,
};
pub use task_filter::{
    COMPETITOR_ADDITIONAL, COMPETITOR_DATE, COMPETITOR_LOCAL_DATE_TIME, COMPETITOR_NAME,
    MAX_DATE_PARAM, REGION, REGION_ADDRESS, TASK_NUMBER_PARAM, TaskFilterStage,
};
