//! Integration tests for `synchro-config`: end-to-end TOML loading feeding
//! the real graph builder (§4.11 end-to-end, §8 scenario 6's config side).

use std::io::Write;

use synchro_config::load_run_config;
use synchro_core::EventBus;
use synchro_graph::{GraphManager, NeuralConfig};

fn write_silent_wav(path: &std::path::Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..1600 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn loaded_config_builds_and_runs_a_graph() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("in.wav");
    write_silent_wav(&input_path);
    let output_path = dir.path().join("take.wav");

    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        r#"
        [settings]
        name = "loopback"
        input_interval_secs = 0.01
        processor_interval_secs = 0.005

        [settings.limits]
        run_time_seconds = 1

        [[nodes]]
        name = "input"
        node_type = "input_file"
        path = "{input}"
        looping = true
        enforce_float32 = false

        [[nodes]]
        name = "output"
        node_type = "output_file"
        path = "$WORKING_DIR/take.wav"

        edges = [["input", "output"]]
        "#,
        input = input_path.display(),
    )
    .unwrap();

    let run = load_run_config(config_file.path()).unwrap();
    let events = EventBus::new();
    let built = GraphManager::build(&run.graph, &run.settings, &NeuralConfig::default(), events, dir.path()).unwrap();
    let manager = GraphManager::new(built);
    manager.execute(&run.settings).unwrap();

    let start = std::time::Instant::now();
    while manager.is_running() && start.elapsed() < std::time::Duration::from_secs(3) {
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    manager.stop();

    assert!(output_path.exists(), "graph output should land at the substituted $WORKING_DIR path");
}

#[test]
fn rejects_node_name_shorter_than_three_characters() {
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        r#"
        [settings]
        name = "bad"

        [[nodes]]
        name = "ab"
        node_type = "output_file"
        path = "out.wav"

        edges = []
        "#
    )
    .unwrap();

    let err = load_run_config(config_file.path()).unwrap_err();
    assert!(matches!(err, synchro_config::ConfigError::NodeNameTooShort(_)));
}
