use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
    move |key| map.get(key).cloned()
}

#[test]
fn normalizes_host_port_to_http_url() {
    assert_eq!(
        normalize_api_base("localhost:8000/api/"),
        "http://localhost:8000/api"
    );
}

#[test]
fn keeps_explicit_scheme() {
    assert_eq!(
        normalize_api_base(" https://tutorial.example/api "),
        "https://tutorial.example/api"
    );
}

#[test]
fn empty_api_base_falls_back_to_default() {
    assert_eq!(normalize_api_base("  "), DEFAULT_API_BASE);
    assert_eq!(normalize_api_base("/"), DEFAULT_API_BASE);
}

#[test]
fn app_prefixed_env_wins_over_legacy_name() {
    let mut settings = ClientSettings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[
            ("CQ_TUTORIAL_API_BASE", "http://legacy/api"),
            ("APP__API_BASE", "http://preferred/api/"),
        ]),
    );
    assert_eq!(settings.api_base, "http://preferred/api");
}

#[test]
fn unparsable_timeout_is_ignored() {
    let mut settings = ClientSettings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[("APP__REQUEST_TIMEOUT_SECS", "soon")]),
    );
    assert_eq!(settings.request_timeout_secs, 30);

    apply_env_overrides(
        &mut settings,
        env_from(&[("APP__REQUEST_TIMEOUT_SECS", "5")]),
    );
    assert_eq!(settings.request_timeout(), Duration::from_secs(5));
}

#[test]
fn zero_timeout_is_clamped_to_one_second() {
    let settings = ClientSettings {
        request_timeout_secs: 0,
        ..ClientSettings::default()
    };
    assert_eq!(settings.request_timeout(), Duration::from_secs(1));
}

#[test]
fn file_settings_apply_known_keys() {
    let mut settings = ClientSettings::default();
    apply_file_settings(
        &mut settings,
        r#"
api_base = "127.0.0.1:9000/api"
request_timeout_secs = 12
log_filter = "client_core=debug"
"#,
    );
    assert_eq!(settings.api_base, "http://127.0.0.1:9000/api");
    assert_eq!(settings.request_timeout_secs, 12);
    assert_eq!(settings.log_filter, "client_core=debug");
}

#[test]
fn load_settings_from_reads_explicit_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("cq_tutorial_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("tutorial.toml");
    fs::write(&path, "request_timeout_secs = 7\n").expect("write settings");

    let settings = load_settings_from(&path).expect("load settings");
    assert_eq!(settings.request_timeout_secs, 7);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn load_settings_from_missing_file_reports_path() {
    let err = load_settings_from(Path::new("/definitely/missing/tutorial.toml"))
        .expect_err("must fail");
    assert!(err.to_string().contains("/definitely/missing/tutorial.toml"));
}
