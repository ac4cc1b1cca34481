use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::Table;
use serde_json::Value;
use tracing::{debug, info, info_span, trace, warn};

use zoomos_cli::config::{AppConfig, RunOverrides, parse_parameter};
use zoomos_cli::logging::redact_value;
use zoomos_core::export::{CSV_FORMAT, EXPORT_FORMAT_PARAM};
use zoomos_core::{
    FileProcessingService, FileTicket, InMemoryFileStore, PoolConfig, StrategyRegistry,
    build_default_registry,
};
use zoomos_ingest::{CsvRowReader, read_all_rows};
use zoomos_model::{ClientId, FileStatus, ProcessingStats, StrategyKind};

use crate::cli::{InspectArgs, ProcessArgs, StrategiesArgs};
use crate::summary::apply_table_style;
use crate::types::{FileSummary, ProcessResult};

enum Scheduled {
    Finished(FileSummary),
    Running(PathBuf, FileTicket),
}

pub fn run_process(args: &ProcessArgs) -> Result<ProcessResult> {
    let process_span = info_span!("process", client_id = args.client_id);
    let _process_guard = process_span.enter();

    let app_config = AppConfig::load_or_default(args.config.as_deref())?;
    let registry = load_registry(&app_config);

    let mut overrides = RunOverrides {
        client_id: args.client_id,
        client_name: args.client_name.clone(),
        strategy: args.strategy,
        parameters: args
            .params
            .iter()
            .map(|raw| parse_parameter(raw))
            .collect::<Result<_>>()?,
        competitors: args.competitors.clone(),
    };
    if let Some(dir) = &args.export_dir {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        if !overrides
            .parameters
            .iter()
            .any(|(key, _)| key == EXPORT_FORMAT_PARAM)
        {
            overrides.parameters.push((
                EXPORT_FORMAT_PARAM.to_string(),
                Value::String(CSV_FORMAT.to_string()),
            ));
        }
    }
    let run_config = app_config.run_configuration(&overrides);
    let chain = registry.resolve(&run_config.client);
    info!(
        chain = chain.name(),
        stages = ?chain.stage_names(),
        files = args.files.len(),
        "processing files"
    );

    let mut pool_config = PoolConfig::default();
    if let Some(workers) = args.workers {
        pool_config.workers = workers;
    }
    if let Some(capacity) = args.queue_capacity {
        pool_config.queue_capacity = capacity;
    }
    let store = Arc::new(InMemoryFileStore::new());
    let service = FileProcessingService::new(registry, store, pool_config)
        .context("start worker pool")?;
    let tracker = service.tracker();
    let client_id = ClientId(args.client_id);

    let mut scheduled = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let record = tracker
            .register_upload(client_id, &display_name(path))
            .context("register upload")?;
        let failed = |message: String| {
            let status = match tracker.mark_failed(record.id, &message) {
                Ok(record) => record.status,
                Err(error) => {
                    warn!(file_id = %record.id, error = %error, "failed to record failure");
                    FileStatus::Error
                }
            };
            Scheduled::Finished(FileSummary {
                id: Some(record.id),
                path: path.clone(),
                chain: chain.name().to_string(),
                status,
                stats: ProcessingStats::default(),
                message: Some(message),
                export: None,
            })
        };
        let rows = match read_all_rows(path) {
            Ok(rows) => rows,
            Err(error) => {
                scheduled.push(failed(error.to_string()));
                continue;
            }
        };
        debug!(file_id = %record.id, rows = rows.len(), "rows loaded");
        match service.submit_file(record.id, rows, run_config.clone()) {
            Ok(ticket) => scheduled.push(Scheduled::Running(path.clone(), ticket)),
            Err(error) => scheduled.push(failed(error.to_string())),
        }
    }

    let mut files = Vec::with_capacity(scheduled.len());
    for entry in scheduled {
        let summary = match entry {
            Scheduled::Finished(summary) => summary,
            Scheduled::Running(path, ticket) => {
                collect_result(tracker, &path, ticket, args.export_dir.as_deref())?
            }
        };
        files.push(summary);
    }
    service.shutdown();

    let totals = ProcessingStats::merge(files.iter().map(|file| &file.stats));
    let has_errors = files
        .iter()
        .any(|file| file.status != FileStatus::Completed);
    Ok(ProcessResult {
        client_id: args.client_id,
        files,
        totals,
        has_errors,
    })
}

fn collect_result(
    tracker: &zoomos_core::LifecycleTracker,
    path: &Path,
    ticket: FileTicket,
    export_dir: Option<&Path>,
) -> Result<FileSummary> {
    let id = ticket.id;
    let Some(processed) = ticket.wait() else {
        let message = "worker stopped before reporting a result".to_string();
        let status = tracker
            .mark_failed(id, &message)
            .map_or(FileStatus::Error, |record| record.status);
        return Ok(FileSummary {
            id: Some(id),
            path: path.to_path_buf(),
            chain: String::new(),
            status,
            stats: ProcessingStats::default(),
            message: Some(message),
            export: None,
        });
    };
    let chain = processed
        .envelope
        .statistics
        .get("chain")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let (status, message) = match &processed.record {
        Ok(record) => (record.status, record.error_message.clone()),
        Err(error) => {
            let status = tracker
                .find(id)
                .map_or(FileStatus::Error, |record| record.status);
            (status, Some(error.to_string()))
        }
    };
    let export = match (&processed.envelope.artifact, export_dir) {
        (Some(artifact), Some(dir)) => {
            let target = dir.join(format!("{}-{}", file_stem(path), artifact.file_name));
            fs::write(&target, &artifact.bytes)
                .with_context(|| format!("write {}", target.display()))?;
            info!(file_id = %id, path = %target.display(), "export written");
            Some(target)
        }
        _ => None,
    };
    if let Some(row) = processed.envelope.rows.first() {
        trace!(
            file_id = %id,
            first_row = ?row.iter().map(|(key, value)| (key.as_str(), redact_value(value))).collect::<Vec<_>>(),
            "first processed row"
        );
    }
    Ok(FileSummary {
        id: Some(id),
        path: path.to_path_buf(),
        chain,
        status,
        stats: processed.envelope.stats,
        message,
        export,
    })
}

pub fn run_strategies(args: &StrategiesArgs) -> Result<()> {
    let app_config = AppConfig::load_or_default(args.config.as_deref())?;
    let registry = load_registry(&app_config);

    let mut table = Table::new();
    table.set_header(vec!["Binding", "Chain", "Stages", "Parameters"]);
    apply_table_style(&mut table);
    for binding in registry.bindings() {
        table.add_row(vec![
            binding.binding,
            binding.chain,
            binding.stages.join(" -> "),
            if binding.parameters.is_empty() {
                "-".to_string()
            } else {
                binding.parameters.join(", ")
            },
        ]);
    }
    println!("{table}");

    let mut kinds = Table::new();
    kinds.set_header(vec!["Strategy", "Description"]);
    apply_table_style(&mut kinds);
    for kind in StrategyKind::ALL {
        kinds.add_row(vec![kind.as_str(), kind.description()]);
    }
    println!("{kinds}");
    Ok(())
}

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let mut reader = CsvRowReader::open(&args.file)
        .with_context(|| format!("open {}", args.file.display()))?
        .with_batch_size(args.rows.max(1));
    let analysis = reader.analysis();
    let headers = reader.headers().to_vec();
    println!("File: {}", args.file.display());
    println!("Delimiter: {}", delimiter_label(analysis.delimiter));
    println!("Encoding: {}", analysis.encoding.name());
    println!("UTF-8 BOM: {}", if analysis.has_utf8_bom { "yes" } else { "no" });
    println!("Columns: {}", headers.len());

    let preview = match reader.next() {
        Some(batch) => batch.with_context(|| format!("read {}", args.file.display()))?,
        None => Vec::new(),
    };
    let mut table = Table::new();
    table.set_header(headers.clone());
    apply_table_style(&mut table);
    for row in preview.iter().take(args.rows) {
        table.add_row(
            headers
                .iter()
                .map(|header| row.get(header).cloned().unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }
    println!("{table}");
    Ok(())
}

fn load_registry(app_config: &AppConfig) -> Arc<StrategyRegistry> {
    let directory = app_config.reference_directory();
    debug!(
        tasks = directory.task_count(),
        retail_entries = directory.retail_count(),
        "reference directory loaded"
    );
    Arc::new(build_default_registry(Arc::new(directory)))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

fn delimiter_label(delimiter: u8) -> &'static str {
    match delimiter {
        b',' => "comma",
        b';' => "semicolon",
        b'\t' => "tab",
        b'|' => "pipe",
        _ => "other",
    }
}
