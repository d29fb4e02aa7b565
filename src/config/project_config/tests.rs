use super::*;

#[test]
fn test_normalize_detector_name() {
    assert_eq!(normalize_detector_name("PolyadicSqliDetector"), "polyadic-sqli");
    assert_eq!(normalize_detector_name("polyadic_sqli"), "polyadic-sqli");
    assert_eq!(normalize_detector_name("mybatis-xml-sqli"), "mybatis-xml-sqli");
    assert_eq!(normalize_detector_name("SQLInjectionDetector"), "sql-injection");
}

#[test]
fn test_glob_match() {
    assert!(glob_match("**/generated/**", "src/generated/Dao.java"));
    assert!(glob_match("generated/", "generated/Dao.java"));
    assert!(glob_match("*Test.java", "UserDaoTest.java"));
    assert!(glob_match("src/**Mapper.xml", "src/main/UserMapper.xml"));
    assert!(!glob_match("vendor/", "src/vendor/Foo.java"));
}

#[test]
fn test_default_config() {
    let config = ProjectConfig::default();
    assert!(config.is_detector_enabled("polyadic-sqli"));
    assert!(config.is_detector_enabled("unknown-detector"));
    assert!(config.severity_override("polyadic-sqli").is_none());
    assert!(config.sqli.require_sql_shape);
    assert!(config.sqli.ignore_list().contains("orderByClause"));
    assert!(config.allowlist.allow_list().is_empty());
}

#[test]
fn test_builtin_excludes() {
    let config = ProjectConfig::default();
    assert!(config.should_exclude(Path::new("target/classes/A.java")));
    assert!(config.should_exclude(Path::new("web/node_modules/x/pom.xml")));
    assert!(!config.should_exclude(Path::new("src/main/java/A.java")));
}

#[test]
fn test_parse_toml_config() {
    let toml_content = r#"
[sqli]
ignored_vars = ["sortColumn"]
require_sql_shape = false

[detectors.mybatis-xml-sqli]
enabled = false

[detectors.polyadic-sqli]
severity = "Medium"

[allowlist]
fingerprints = [42, 7]

[exclude]
paths = ["generated/"]
"#;

    let config: ProjectConfig = toml::from_str(toml_content).expect("parse project config");

    assert!(!config.is_detector_enabled("mybatis-xml-sqli"));
    assert!(config.is_detector_enabled("polyadic-sqli"));
    assert_eq!(config.severity_override("polyadic-sqli"), Some(Severity::Medium));

    let ignore = config.sqli.ignore_list();
    assert!(ignore.contains("sortColumn"));
    assert!(!ignore.contains("orderByClause"));
    // untouched keys keep their defaults
    assert!(ignore.contains("ew.sqlSegment"));
    assert_eq!(config.sqli.log_method_markers.len(), DEFAULT_LOG_METHOD_MARKERS.len());
    assert!(!config.sqli.require_sql_shape);

    assert!(config.allowlist.allow_list().allows(42));
    assert!(config.should_exclude(Path::new("generated/Dao.java")));
}

#[test]
fn test_default_template_parses() {
    let config: ProjectConfig = toml::from_str(DEFAULT_CONFIG_TOML).expect("parse template");
    assert_eq!(config.sqli.ignored_vars, owned(DEFAULT_IGNORED_VARS));
    assert!(config.sqli.require_sql_shape);
}

#[test]
fn test_load_missing_and_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_project_config(dir.path());
    assert!(config.detectors.is_empty());

    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "this is [[ not toml").unwrap();
    let config = load_project_config(dir.path());
    assert!(config.sqli.require_sql_shape);

    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[detectors.polyadic-sqli]\nenabled = false\n",
    )
    .unwrap();
    assert!(!load_project_config(dir.path()).is_detector_enabled("polyadic-sqli"));
}
