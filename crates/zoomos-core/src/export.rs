//! CSV export of processed rows.

use std::collections::BTreeSet;

use zoomos_model::{ExportArtifact, ParameterDescriptor, ParameterKind, Row, RunConfiguration};

use crate::error::Result;

/// Parameter requesting an export artifact for the run.
pub const EXPORT_FORMAT_PARAM: &str = "exportFormat";
pub const CSV_FORMAT: &str = "csv";

pub fn export_format_descriptor() -> ParameterDescriptor {
    ParameterDescriptor::new(EXPORT_FORMAT_PARAM, "Export format", ParameterKind::Select)
        .with_description("Render processed rows to a file")
        .with_allowed_values([CSV_FORMAT])
}

/// Whether `config` asks for a CSV artifact.
pub fn csv_requested(config: &RunConfiguration) -> bool {
    config
        .parameter_text(EXPORT_FORMAT_PARAM)
        .is_some_and(|format| format == CSV_FORMAT)
}

/// Artifact file name: `<client id>-<chain>.csv`.
pub fn artifact_name(config: &RunConfiguration, chain: &str) -> String {
    format!("{}-{chain}.{CSV_FORMAT}", config.client.id)
}

/// Render rows to CSV. The header is the sorted union of all row columns;
/// missing values are written empty.
pub fn render_csv(rows: &[Row]) -> Result<Vec<u8>> {
    let headers: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    let mut writer = csv::Writer::from_writer(Vec::new());
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|header| row.get(*header).map_or("", String::as_str)),
        )?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(bytes)
}

pub fn csv_artifact(config: &RunConfiguration, chain: &str, rows: &[Row]) -> Result<ExportArtifact> {
    Ok(ExportArtifact {
        file_name: artifact_name(config, chain),
        content_type: "text/csv".to_string(),
        bytes: render_csv(rows)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoomos_model::row_from_pairs;

    #[test]
    fn header_is_union_of_columns() {
        let rows = vec![
            row_from_pairs([("b", "2"), ("a", "1")]),
            row_from_pairs([("c", "x,y")]),
        ];
        let text = String::from_utf8(render_csv(&rows).unwrap()).unwrap();
        assert_eq!(text, "a,b,c\n1,2,\n,,\"x,y\"\n");
    }
}
