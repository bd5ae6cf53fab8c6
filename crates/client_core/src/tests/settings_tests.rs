use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{TimeZone, Utc};

use super::*;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("speech_console_settings_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn defaults_match_backend_routes() {
    let endpoints = ClientSettings::default().endpoints().expect("endpoints");
    assert_eq!(endpoints.health.as_str(), "http://localhost:8000/health");
    assert_eq!(endpoints.collection.as_str(), "http://localhost:8000/api/users");
    assert_eq!(endpoints.conversion.as_str(), "http://localhost:8000/api/tts");
}

#[test]
fn file_values_override_defaults() {
    let path = temp_file(
        "client.toml",
        r#"
base_url = "http://backend:9000"
conversion_path = "/api/backend/tts"
request_timeout_secs = 30
"#,
    );

    let mut settings = ClientSettings::default();
    settings.apply_file(&path).expect("apply file");

    assert_eq!(settings.base_url, "http://backend:9000");
    assert_eq!(settings.conversion_path, "/api/backend/tts");
    assert_eq!(settings.health_path, "/health");
    assert_eq!(settings.request_timeout_secs, Some(30));

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn unknown_file_keys_are_rejected() {
    let path = temp_file("client.toml", "retry_attempts = 3\n");

    let err = ClientSettings::default()
        .apply_file(&path)
        .expect_err("must fail");
    assert!(matches!(err, SettingsError::Parse { .. }), "unexpected: {err}");

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let missing = env::temp_dir().join("speech_console_settings_missing/client.toml");
    let err = ClientSettings::load(Some(&missing)).expect_err("must fail");
    assert!(matches!(err, SettingsError::Read { .. }), "unexpected: {err}");
}

#[test]
fn env_overrides_win() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("APP__BASE_URL", "http://10.0.0.5:8000"),
        ("APP__COLLECTION_PATH", "/api/v2/users"),
        ("APP__DATE_UTC_OFFSET_MINUTES", "-300"),
    ]);

    let mut settings = ClientSettings::default();
    settings
        .apply_env(|key| vars.get(key).map(|v| v.to_string()))
        .expect("apply env");

    let endpoints = settings.endpoints().expect("endpoints");
    assert_eq!(endpoints.collection.as_str(), "http://10.0.0.5:8000/api/v2/users");

    let new_year = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(settings.date_style().expect("dates").format(&new_year), "12/31/2023");
}

#[test]
fn malformed_env_number_is_rejected() {
    let mut settings = ClientSettings::default();
    let err = settings
        .apply_env(|key| (key == "APP__REQUEST_TIMEOUT_SECS").then(|| "soon".to_string()))
        .expect_err("must fail");
    assert!(matches!(
        err,
        SettingsError::InvalidValue {
            key: "APP__REQUEST_TIMEOUT_SECS",
            ..
        }
    ));
}

#[test]
fn invalid_base_url_is_rejected() {
    let settings = ClientSettings {
        base_url: "not a url".into(),
        ..ClientSettings::default()
    };
    assert!(matches!(
        settings.endpoints(),
        Err(SettingsError::InvalidUrl { .. })
    ));
}

#[test]
fn out_of_range_offset_is_rejected() {
    let settings = ClientSettings {
        date_utc_offset_minutes: Some(24 * 60),
        ..ClientSettings::default()
    };
    assert!(settings.date_style().is_err());
}
