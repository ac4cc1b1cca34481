use tracing::level_filters::LevelFilter;
use zoomos_cli::logging::{
    LogConfig, LogFormat, REDACTED_VALUE, default_directives, init_logging, log_data_enabled,
    redact_value,
};

#[test]
fn default_directives_cover_workspace_targets() {
    assert_eq!(
        default_directives(LevelFilter::DEBUG),
        "warn,zoomos=debug,zoomos_cli=debug,zoomos_core=debug,zoomos_ingest=debug,zoomos_model=debug"
    );
}

#[test]
fn file_logging_redacts_row_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zoomos.log");
    let config = LogConfig {
        use_env_filter: false,
        with_ansi: false,
        ..LogConfig::default()
    }
    .with_level(LevelFilter::INFO)
    .with_format(LogFormat::Compact)
    .with_log_file(Some(path.clone()))
    .with_log_data(false);
    init_logging(&config).unwrap();

    assert!(!log_data_enabled());
    assert_eq!(redact_value("okeydostavka.ru"), REDACTED_VALUE);
    tracing::warn!(value = redact_value("okeydostavka.ru"), "row rejected");

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("row rejected"));
    assert!(written.contains(REDACTED_VALUE));
    assert!(!written.contains("okeydostavka.ru"));
}
