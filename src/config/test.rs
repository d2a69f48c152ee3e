use super::*;

#[test]
fn test_defaults() {
    let config = RuntimeConfig::from_yaml("").unwrap();
    assert_eq!(config, RuntimeConfig::default());
    assert_eq!(config.idle_sleep_ms, 5);
    assert_eq!(config.state_file, 1337);
    assert_eq!(config.key_file, 7);
}

#[test]
fn test_partial_override() {
    let config = RuntimeConfig::from_yaml("idle_sleep_ms: 20\npersist_keys: false\n").unwrap();
    assert_eq!(config.idle_sleep_ms, 20);
    assert!(!config.persist_keys);
    assert_eq!(config.initial_pets, 1);
}

#[test]
fn test_round_trip() {
    let config = RuntimeConfig {
        initial_pets: 3,
        ..RuntimeConfig::default()
    };
    let yaml = config.to_yaml().unwrap();
    assert_eq!(RuntimeConfig::from_yaml(&yaml).unwrap(), config);
}

#[test]
fn test_bad_type() {
    assert!(RuntimeConfig::from_yaml("idle_sleep_ms: soon").is_err());
}
