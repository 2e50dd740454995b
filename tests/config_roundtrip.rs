//! Integration tests: `AnnounceConfig` TOML serialization round-trips and
//! file load/save, mirroring the teacher's `permission_config_roundtrip.rs`.

use utterance_queue::AnnounceConfig;

#[test]
fn default_config_roundtrips_via_toml_string() {
    let config = AnnounceConfig::default();
    let toml_str = toml::to_string(&config).expect("serialize to TOML");
    let restored: AnnounceConfig = toml::from_str(&toml_str).expect("deserialize from TOML");

    assert_eq!(
        restored.queue.default_stable_delay_ms,
        config.queue.default_stable_delay_ms
    );
    assert_eq!(
        restored.speech_synth.inter_utterance_gap_ms,
        config.speech_synth.inter_utterance_gap_ms
    );
    assert_eq!(
        restored.aria_live.regions_per_priority,
        config.aria_live.regions_per_priority
    );
}

#[test]
fn config_without_any_section_deserializes_to_defaults() {
    let toml_str = "";
    let config: AnnounceConfig = toml::from_str(toml_str).expect("deserialize empty TOML");
    assert_eq!(config.queue.default_stable_delay_ms, 200);
    assert_eq!(config.speech_synth.inter_utterance_gap_ms, 250);
    assert_eq!(config.aria_live.regions_per_priority, 4);
}

#[test]
fn partial_section_fills_missing_fields_from_defaults() {
    let toml_str = r#"
        [speech_synth]
        pending_speech_timeout_ms = 9000
    "#;
    let config: AnnounceConfig = toml::from_str(toml_str).expect("deserialize partial TOML");
    assert_eq!(config.speech_synth.pending_speech_timeout_ms, 9000);
    // Untouched fields in the same section still fall back to defaults.
    assert_eq!(config.speech_synth.engine_wake_interval_ms, 8_000);
    assert_eq!(config.queue.default_stable_delay_ms, 200);
}

#[test]
fn file_roundtrip_creates_parent_directories() {
    let dir = std::env::temp_dir().join("utterance-queue-test-config-integration");
    let path = dir.join("nested").join("config.toml");
    let _ = std::fs::remove_dir_all(&dir);

    let mut config = AnnounceConfig::default();
    config.aria_live.regions_per_priority = 6;

    config.save_to_file(&path).expect("save");
    assert!(path.exists());

    let loaded = AnnounceConfig::from_file(&path).expect("load");
    assert_eq!(loaded.aria_live.regions_per_priority, 6);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn default_config_path_is_under_the_crate_name() {
    let path = AnnounceConfig::default_config_path();
    assert!(path.to_string_lossy().contains("utterance-queue"));
    assert!(path.to_string_lossy().ends_with("config.toml"));
}
