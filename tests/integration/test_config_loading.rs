#[path = "../support/mod.rs"]
mod support;

use serial_test::serial;
use std::env;
use std::fs;
use stylestream::logging::config::LoggingConfig;
use stylestream::logging::ConsoleOutput;
use stylestream::{ConfigLoader, ErrorCategory, FileObject, PluginRegistry, StreamAdapter};
use support::{async_doubler, doubler, RuleEngine, Sheet};
use tempfile::TempDir;
use toml::Value;

fn clear_stylestream_env() {
    for v in &[
        "STYLESTREAM_DEFAULT_SOURCE",
        "STYLESTREAM_CHANNEL_CAPACITY",
        "STYLESTREAM_SOURCE_MAP_ANNOTATE",
        "STYLESTREAM_LOG_LEVEL",
        "STYLESTREAM_LOG_CONSOLE",
    ] {
        env::remove_var(v);
    }
}

fn registry() -> PluginRegistry<Sheet> {
    let mut builder = PluginRegistry::builder();
    builder
        .register("doubler", |_options: &Value| Ok(doubler()))
        .unwrap()
        .register("async-doubler", |_options: &Value| Ok(async_doubler()))
        .unwrap();
    builder.build()
}

#[test]
#[serial]
fn test_defaults_without_config_file() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigLoader::load_from_dir(temp_dir.path()).unwrap();
    assert_eq!(config.stage.default_source, "<input css>");
    assert_eq!(config.stage.channel_capacity, 16);
    assert!(config.stage.plugins.is_none());
    assert!(config.source_map.annotate);
}

#[test]
#[serial]
fn test_config_file_values_are_loaded() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("stylestream.toml"),
        r#"
[stage]
default_source = "<stdin>"
channel_capacity = 4
plugins = ["doubler", ["async-doubler"]]

[source_map]
annotate = false

[logging]
default_level = "debug"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_dir(temp_dir.path()).unwrap();
    assert_eq!(config.stage.default_source, "<stdin>");
    assert_eq!(config.stage.channel_capacity, 4);
    assert!(!config.source_map.annotate);
    assert_eq!(
        config.stage.plugins.as_ref().and_then(Value::as_array).map(Vec::len),
        Some(2)
    );
}

#[test]
#[serial]
fn test_env_overrides_take_precedence() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("stylestream.toml"),
        "[stage]\ndefault_source = \"<file>\"\nchannel_capacity = 4\n",
    )
    .unwrap();

    env::set_var("STYLESTREAM_DEFAULT_SOURCE", "<env>");
    env::set_var("STYLESTREAM_CHANNEL_CAPACITY", "32");
    env::set_var("STYLESTREAM_SOURCE_MAP_ANNOTATE", "false");
    let config = ConfigLoader::load_from_dir(temp_dir.path()).unwrap();
    clear_stylestream_env();

    assert_eq!(config.stage.default_source, "<env>");
    assert_eq!(config.stage.channel_capacity, 32);
    assert!(!config.source_map.annotate);
}

#[test]
#[serial]
fn test_unparseable_env_values_are_ignored() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();

    env::set_var("STYLESTREAM_CHANNEL_CAPACITY", "many");
    let config = ConfigLoader::load_from_dir(temp_dir.path()).unwrap();
    clear_stylestream_env();

    assert_eq!(config.stage.channel_capacity, 16);
}

#[test]
#[serial]
fn test_invalid_config_is_a_configuration_error() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stylestream.toml");

    fs::write(&path, "[stage]\nchannel_capacity = 0\n").unwrap();
    let err = ConfigLoader::load_from_dir(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
    assert!(err.message.contains("channel_capacity"));

    fs::write(&path, "[stage]\nplugins = \"doubler\"\n").unwrap();
    let err = ConfigLoader::load_from_dir(temp_dir.path()).unwrap_err();
    assert!(err.message.contains("stage.plugins must be an array"));

    fs::write(&path, "[stage\n").unwrap();
    let err = ConfigLoader::load_from_dir(temp_dir.path()).unwrap_err();
    assert!(err.message.starts_with("Failed to parse config file"));
}

#[test]
#[serial]
fn test_env_var_documentation_lists_overrides() {
    let docs = ConfigLoader::env_var_documentation();
    assert!(docs.iter().any(|d| d.starts_with("STYLESTREAM_DEFAULT_SOURCE")));
    assert!(docs.iter().any(|d| d.starts_with("STYLESTREAM_CHANNEL_CAPACITY")));
    assert!(docs.iter().any(|d| d.starts_with("STYLESTREAM_SOURCE_MAP_ANNOTATE")));
}

#[tokio::test]
#[serial]
async fn test_adapter_from_config_runs_declared_chain() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("stylestream.toml"),
        "[stage]\nplugins = [\"doubler\", \"async-doubler\"]\n",
    )
    .unwrap();
    let config = ConfigLoader::load_from_dir(temp_dir.path()).unwrap();

    let adapter = StreamAdapter::from_config(RuleEngine::new(), &config, &registry()).unwrap();
    assert_eq!(adapter.stage().chain().len(), 2);

    let mut duplex = adapter.spawn();
    duplex
        .write(FileObject::from_contents("a { color: black }"))
        .await
        .unwrap();
    let results = duplex.collect_all().await;
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].as_ref().unwrap().text(),
        Some("a { color: black; color: black; color: black; color: black }")
    );
}

#[test]
#[serial]
fn test_adapter_from_config_without_plugins_fails() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigLoader::load_from_dir(temp_dir.path()).unwrap();

    let err = StreamAdapter::from_config(RuleEngine::new(), &config, &registry())
        .err()
        .unwrap();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
    assert_eq!(err.message, "Please provide array of plugins!");
}

#[test]
#[serial]
fn test_logging_config_file_and_env_precedence() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("stylestream.toml"),
        "[logging]\ndefault_level = \"debug\"\nconsole_output = \"stdout\"\n",
    )
    .unwrap();

    let config = LoggingConfig::load(Some(temp_dir.path())).unwrap();
    assert_eq!(config.default_level, "debug");
    assert_eq!(config.console_output, ConsoleOutput::Stdout);
    assert!(!config.enable_file);

    env::set_var("STYLESTREAM_LOG_LEVEL", "warn");
    env::set_var("STYLESTREAM_LOG_CONSOLE", "none");
    let config = LoggingConfig::load(Some(temp_dir.path())).unwrap();
    clear_stylestream_env();
    assert_eq!(config.default_level, "warn");
    assert_eq!(config.console_output, ConsoleOutput::None);
}

#[test]
#[serial]
fn test_logging_config_rejects_bad_values() {
    clear_stylestream_env();
    env::set_var("STYLESTREAM_LOG_CONSOLE", "printer");
    assert!(LoggingConfig::load(None).is_err());
    clear_stylestream_env();

    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("stylestream.toml"),
        "[logging]\ndefault_level = \"stylestream=loud\"\n",
    )
    .unwrap();
    assert!(LoggingConfig::load(Some(temp_dir.path())).is_err());
}

#[test]
#[serial]
fn test_logging_init_writes_to_log_file_once() {
    clear_stylestream_env();
    let temp_dir = TempDir::new().unwrap();
    let config = LoggingConfig {
        log_dir: Some(temp_dir.path().join("logs")),
        enable_file: true,
        console_output: ConsoleOutput::None,
        ..LoggingConfig::default()
    };

    let guard = stylestream::logging::init(&config, Some(temp_dir.path())).unwrap();
    let log_file = guard.log_file_path().unwrap().to_path_buf();
    assert_eq!(log_file, temp_dir.path().join("logs").join("stylestream.log"));
    assert!(log_file.exists());
    assert_eq!(guard.console_output(), ConsoleOutput::None);

    assert!(stylestream::logging::init(&config, Some(temp_dir.path())).is_err());
}
