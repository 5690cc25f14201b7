use super::*;
use pretty_assertions::assert_eq;
use std::io::Write;

const SAMPLE: &str = r#"
[primary]
host = "db.internal"
user = "app"
password = "secret"
database = "orders"
pool_size = 8

[legacy]
HOST = "10.0.0.5"
USER = "reporter"
PASSWORD = ""
DATABASE = "reports"
PORT = 3307
TIMEOUT = 10
POOLNUM = 2

[broken]
host = ""
user = "app"
password = "x"
database = "orders"
"#;

#[test]
fn test_new_uses_defaults() {
    let settings = ConnectionSettings::new("localhost", "root", "pw", "test");
    assert_eq!(settings.port, DEFAULT_PORT);
    assert_eq!(settings.charset, "utf8mb4");
    assert_eq!(settings.timeout_secs, 3);
    assert_eq!(settings.timeout(), Duration::from_secs(3));
}

#[test]
fn test_timeout_is_at_least_one_second() {
    let settings = ConnectionSettings::new("localhost", "root", "pw", "test").with_timeout_secs(0);
    assert_eq!(settings.timeout(), Duration::from_secs(1));
}

#[test]
fn test_read_timeout_follows_connect_timeout_by_default() {
    let settings = ConnectionSettings::new("localhost", "root", "pw", "test").with_timeout_secs(5);
    assert_eq!(settings.read_timeout(), Some(Duration::from_secs(5)));
}

#[test]
fn test_read_timeout_set_separately_or_disabled() {
    let base = ConnectionSettings::new("localhost", "root", "pw", "test");
    assert_eq!(
        base.clone().with_read_timeout_secs(60).read_timeout(),
        Some(Duration::from_secs(60))
    );
    assert_eq!(base.clone().with_read_timeout_secs(0).read_timeout(), None);
    assert_eq!(base.with_read_timeout_secs(0).timeout(), Duration::from_secs(3));
}

#[test]
fn test_parse_read_timeout() {
    let file = SettingsFile::parse(
        "[s]\nhost = \"h\"\nuser = \"u\"\npassword = \"p\"\ndatabase = \"d\"\nREAD_TIMEOUT = 0\n",
    )
    .unwrap();
    let section = file.section("s").unwrap();
    assert_eq!(section.settings.read_timeout_secs, Some(0));
    assert_eq!(section.settings.read_timeout(), None);
}

#[test]
fn test_validate_rejects_blank_required_fields() {
    let base = ConnectionSettings::new("localhost", "root", "pw", "test");
    assert!(base.validate().is_ok());

    let mut no_host = base.clone();
    no_host.host = "  ".into();
    assert!(matches!(
        no_host.validate(),
        Err(SqlgateError::Configuration(msg)) if msg.contains("host")
    ));

    let mut no_user = base.clone();
    no_user.user.clear();
    assert!(no_user.validate().is_err());

    let mut no_db = base.clone();
    no_db.database.clear();
    assert!(no_db.validate().is_err());
}

#[test]
fn test_validate_allows_empty_password() {
    let settings = ConnectionSettings::new("localhost", "root", "", "test");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_debug_redacts_password() {
    let settings = ConnectionSettings::new("localhost", "root", "hunter2", "test");
    let rendered = format!("{:?}", settings);
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn test_parse_lowercase_section() {
    let file = SettingsFile::parse(SAMPLE).unwrap();
    let section = file.section("primary").unwrap();
    assert_eq!(section.settings.host, "db.internal");
    assert_eq!(section.settings.port, 3306);
    assert_eq!(section.settings.charset, "utf8mb4");
    assert_eq!(section.pool_size, 8);
}

#[test]
fn test_parse_legacy_uppercase_keys() {
    let file = SettingsFile::parse(SAMPLE).unwrap();
    let section = file.section("legacy").unwrap();
    assert_eq!(section.settings.host, "10.0.0.5");
    assert_eq!(section.settings.user, "reporter");
    assert_eq!(section.settings.password, "");
    assert_eq!(section.settings.port, 3307);
    assert_eq!(section.settings.timeout_secs, 10);
    assert_eq!(section.pool_size, 2);
}

#[test]
fn test_pool_size_defaults_to_three() {
    let file = SettingsFile::parse(
        "[s]\nhost = \"h\"\nuser = \"u\"\npassword = \"p\"\ndatabase = \"d\"\n",
    )
    .unwrap();
    assert_eq!(file.section("s").unwrap().pool_size, 3);
}

#[test]
fn test_section_validation_and_lookup_errors() {
    let file = SettingsFile::parse(SAMPLE).unwrap();
    assert!(matches!(
        file.section("broken"),
        Err(SqlgateError::Configuration(_))
    ));
    assert!(matches!(
        file.section("missing"),
        Err(SqlgateError::Configuration(msg)) if msg.contains("missing")
    ));
    assert_eq!(
        file.section_names().collect::<Vec<_>>(),
        vec!["broken", "legacy", "primary"]
    );
}

#[test]
fn test_missing_required_key_is_parse_error() {
    let result = SettingsFile::parse("[s]\nhost = \"h\"\n");
    assert!(matches!(result, Err(SqlgateError::SettingsParse(_))));
}

#[test]
fn test_load_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let loaded = SettingsFile::load(file.path()).unwrap();
    assert_eq!(loaded.section("primary").unwrap().settings.database, "orders");
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = SettingsFile::load(dir.path().join("nope.toml"));
    assert!(matches!(result, Err(SqlgateError::Configuration(_))));
}
