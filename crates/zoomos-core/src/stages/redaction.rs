use serde_json::Value;
use tracing::debug;
use zoomos_model::{ParameterDescriptor, ParameterKind, Row, RunConfiguration};

use crate::aggregator::StatisticsAggregator;
use crate::error::StageFailure;
use crate::stage::TransformationStage;

/// Parameter carrying a JSON array of competitor domains.
pub const COMPETITORS_PARAM: &str = "competitors";

/// Competitors redacted when a run configures none.
pub const DEFAULT_COMPETITORS: [&str; 7] = [
    "auchan.ru",
    "lenta.com",
    "metro-cc.ru",
    "myspar.ru",
    "okeydostavka.ru",
    "perekrestok.ru",
    "winelab.ru",
];

/// Competitor list for a run.
///
/// Exclusions on the run configuration win, then the `competitors`
/// parameter, then [`DEFAULT_COMPETITORS`]. Blank entries are dropped.
pub fn resolve_competitors(config: &RunConfiguration) -> Result<Vec<String>, StageFailure> {
    if !config.excluded_competitors.is_empty() {
        return Ok(non_blank(config.excluded_competitors.iter().map(String::as_str)));
    }
    match config.parameter(COMPETITORS_PARAM) {
        None | Some(Value::Null) => Ok(non_blank(DEFAULT_COMPETITORS)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    StageFailure::Configuration(format!(
                        "'{COMPETITORS_PARAM}' must contain only strings, found {item}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(non_blank),
        Some(other) => Err(StageFailure::Configuration(format!(
            "'{COMPETITORS_PARAM}' must be an array of strings, found {other}"
        ))),
    }
}

fn non_blank<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Clears a target field on rows whose match field contains a competitor.
///
/// Matching is substring containment and stops at the first competitor that
/// matches. Every cleared row counts as one success; other rows pass through
/// untouched.
#[derive(Debug, Clone)]
pub struct CompetitorRedactionStage {
    name: &'static str,
    match_field: &'static str,
    target_field: &'static str,
}

impl CompetitorRedactionStage {
    pub fn new(name: &'static str, match_field: &'static str, target_field: &'static str) -> Self {
        Self {
            name,
            match_field,
            target_field,
        }
    }

    /// Clear `competitorWebCacheUrl` when the URL itself names a competitor.
    pub fn web_cache_url() -> Self {
        Self::new(
            "web-cache-url-redaction",
            "competitorWebCacheUrl",
            "competitorWebCacheUrl",
        )
    }

    /// Clear the competitor URL when the competitor name names a competitor.
    pub fn clean_urls() -> Self {
        Self::new(
            "clean-urls",
            "competitordata.competitorName",
            "competitordata.competitorWebCacheUrl",
        )
    }

    pub fn match_field(&self) -> &str {
        self.match_field
    }

    pub fn target_field(&self) -> &str {
        self.target_field
    }
}

impl TransformationStage for CompetitorRedactionStage {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Clear competitor URLs before export"
    }

    fn parameter_descriptors(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor::new(COMPETITORS_PARAM, "Competitors", ParameterKind::StringList)
                .with_description("Competitor domains whose URLs are cleared"),
        ]
    }

    fn apply(
        &self,
        mut rows: Vec<Row>,
        config: &RunConfiguration,
        stats: &StatisticsAggregator,
    ) -> Result<Vec<Row>, StageFailure> {
        let competitors = resolve_competitors(config)?;
        let mut cleared = 0u64;
        for row in &mut rows {
            let matches = row.get(self.match_field).is_some_and(|value| {
                competitors
                    .iter()
                    .any(|competitor| value.contains(competitor.as_str()))
            });
            if !matches {
                continue;
            }
            // Absent or already empty targets are left alone and not counted.
            if let Some(target) = row.get_mut(self.target_field)
                && !target.is_empty()
            {
                target.clear();
                cleared += 1;
            }
        }
        stats.increment_success_by(cleared);
        debug!(
            stage = self.name,
            competitors = competitors.len(),
            cleared,
            "competitor fields cleared"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zoomos_model::ClientIdentity;

    #[test]
    fn exclusions_take_precedence_over_parameter() {
        let config = RunConfiguration::new(ClientIdentity::new(7))
            .with_parameter(COMPETITORS_PARAM, json!(["lenta.com"]))
            .with_excluded_competitors(["winelab.ru", " "]);
        assert_eq!(resolve_competitors(&config).unwrap(), vec!["winelab.ru"]);
    }

    #[test]
    fn parameter_used_when_no_exclusions() {
        let config = RunConfiguration::new(ClientIdentity::new(7))
            .with_parameter(COMPETITORS_PARAM, json!(["lenta.com"]));
        assert_eq!(resolve_competitors(&config).unwrap(), vec!["lenta.com"]);
    }

    #[test]
    fn defaults_used_when_nothing_configured() {
        let config = RunConfiguration::new(ClientIdentity::new(7));
        assert_eq!(resolve_competitors(&config).unwrap().len(), DEFAULT_COMPETITORS.len());
    }

    #[test]
    fn non_array_parameter_is_a_configuration_error() {
        let config = RunConfiguration::new(ClientIdentity::new(7))
            .with_parameter(COMPETITORS_PARAM, "lenta.com");
        assert!(matches!(
            resolve_competitors(&config),
            Err(StageFailure::Configuration(_))
        ));
    }
}
