//! Integration tests for agent configuration and report delivery.

use std::io::Write;

use clap::Parser;
use defender_agent::cli::Args;
use defender_agent::{AgentConfig, PipeSink, ReportSink, Topic};
use defender_metrics::{FieldNames, Format, ListeningPort, Sample};

/// Test configuration loading from YAML.
#[test]
fn test_config_yaml_parsing() {
    let yaml = r#"
client_id: gateway
thing_name: gateway-thing
interval_secs: 60
format: cbor
short_names: true
max_list_size: 5
log_level: debug
log_format: json
"#;

    let config: AgentConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.thing_name(), "gateway-thing");
    assert_eq!(config.client_id(), "gateway");
    assert_eq!(config.interval_secs, 60);
    assert_eq!(config.format, Format::Cbor);
    assert!(config.short_names);
    assert_eq!(config.max_list_size, 5);
    assert!(!config.dry_run);
    assert_eq!(config.cbor_output, "cbor_metrics");
    assert!(config.validate().is_ok());
}

/// Test that an unknown format is rejected at parse time.
#[test]
fn test_config_rejects_unknown_format() {
    assert!(serde_yaml::from_str::<AgentConfig>("format: xml").is_err());
}

/// Test loading from a file with CLI overrides on top.
#[test]
fn test_config_file_with_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "interval_secs: 120\nthing_name: from-file").unwrap();

    let path = file.path().to_string_lossy().to_string();
    let args = Args::parse_from(["defender-agent", "--config", &path, "--interval", "15"]);

    let config = AgentConfig::from_args(&args).unwrap();
    assert_eq!(config.interval_secs, 15);
    assert_eq!(config.thing_name(), "from-file");
}

/// Test that a missing explicit config file is an error.
#[test]
fn test_missing_config_file() {
    let args = Args::parse_from(["defender-agent", "--config", "/nonexistent/agent.yaml"]);
    assert!(AgentConfig::from_args(&args).is_err());
}

/// Test that compact names reach the published payload.
#[test]
fn test_pipe_sink_with_short_names() {
    let mut sample = Sample::at(FieldNames::compact(), 1_600_000_000, None);
    sample.record_listening_ports("udp", vec![ListeningPort::on_interface(53, "eth0")]);

    let mut sink = PipeSink::new(Vec::new(), Format::Json);
    sink.deliver(&Topic::new("thing", Format::Json), &sample.build_report())
        .unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let (_, payload) = out.trim_end().split_once(' ').unwrap();
    let value: serde_json::Value = serde_json::from_str(payload).unwrap();
    assert_eq!(value["met"]["up"]["pts"][0]["pt"], 53);
    assert_eq!(value["met"]["up"]["pts"][0]["if"], "eth0");
    assert_eq!(value["hed"]["v"], "1.0");
}
