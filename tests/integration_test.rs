//! End-to-end tests driving the sqlsentry binary over fixture projects

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const FIXTURES: &[(&str, &str)] = &[
    ("UserDao.java", "src/main/java/com/example/dao/UserDao.java"),
    ("OrderMapper.java", "src/main/java/com/example/mapper/OrderMapper.java"),
    ("OrderMapper.xml", "src/main/resources/mapper/OrderMapper.xml"),
];

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn project() -> TempDir {
    let dir = tempfile::Builder::new()
        .prefix("sqlsentry-it")
        .tempdir()
        .expect("create temp dir");
    for (name, target) in FIXTURES {
        let dest = dir.path().join(target);
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::copy(fixture_dir().join(name), dest).unwrap();
    }
    dir
}

fn sqlsentry(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlsentry"))
        .args(args)
        .current_dir(cwd)
        // keep the feedback collaborator off and the user config out of the way
        .env_remove("SQLSENTRY_FEEDBACK_URL")
        .env("XDG_CONFIG_HOME", cwd.join(".no-config"))
        .env("HOME", cwd)
        .env("NO_COLOR", "1")
        .output()
        .expect("run sqlsentry")
}

fn scan_json(dir: &Path) -> serde_json::Value {
    let output = sqlsentry(&["scan", ".", "--format", "json"], dir);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("JSON report on stdout")
}

fn detectors_of(report: &serde_json::Value) -> Vec<String> {
    report["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["detector"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_scan_json_reports_every_detector() {
    let dir = project();
    let report = scan_json(dir.path());

    assert_eq!(report["files_scanned"], 3);
    let detectors = detectors_of(&report);
    assert_eq!(detectors.iter().filter(|d| *d == "polyadic-sqli").count(), 2);
    assert_eq!(detectors.iter().filter(|d| *d == "format-string-sqli").count(), 1);
    assert_eq!(detectors.iter().filter(|d| *d == "mybatis-annotation-sqli").count(), 2);
    assert_eq!(detectors.iter().filter(|d| *d == "mybatis-xml-sqli").count(), 3);

    let findings = report["findings"].as_array().unwrap();
    assert!(findings.iter().all(|f| f["cwe_id"] == "CWE-89"));
    let first = &findings[0];
    assert_eq!(first["fqname"], "com.example.dao.UserDao List<User> findByName(String name)");
}

#[test]
fn test_fail_on_findings_sets_exit_code() {
    let dir = project();
    let output = sqlsentry(&["scan", ".", "--fail-on-findings"], dir.path());
    assert_eq!(output.status.code(), Some(1));

    let clean = tempfile::Builder::new().prefix("sqlsentry-clean").tempdir().unwrap();
    fs::write(clean.path().join("A.java"), "class A { int x = 1 + 2; }\n").unwrap();
    let output = sqlsentry(&["scan", ".", "--fail-on-findings"], clean.path());
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No SQL injection risks found."));
}

#[test]
fn test_fix_rewrites_templates_and_comments_java() {
    let dir = project();
    let output = sqlsentry(&["fix", "."], dir.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let xml = fs::read_to_string(dir.path().join(FIXTURES[2].1)).unwrap();
    assert!(xml.contains("where owner like CONCAT('%', #{owner}, '%') "));
    assert!(xml.contains("order by ${orderByClause}"));
    assert!(xml.contains("<foreach collection=\"ids\" item=\"idsItem\""));
    assert!(xml.contains("<!-- sqlsentry: possible SQL injection"));

    let mapper = fs::read_to_string(dir.path().join(FIXTURES[1].1)).unwrap();
    assert!(mapper.contains("@Select(\"select * from orders where owner = #{owner}\")"));
    assert!(mapper.contains("@Update(\"update orders set state = #{state} where id in (${ids})\")"));

    let dao = fs::read_to_string(dir.path().join(FIXTURES[0].1)).unwrap();
    assert_eq!(dao.matches("// sqlsentry: possible SQL injection").count(), 3);
}

#[test]
fn test_fix_is_idempotent_for_comments() {
    let dir = project();
    assert!(sqlsentry(&["fix", "."], dir.path()).status.success());
    let once = fs::read_to_string(dir.path().join(FIXTURES[0].1)).unwrap();
    assert!(sqlsentry(&["fix", "."], dir.path()).status.success());
    let twice = fs::read_to_string(dir.path().join(FIXTURES[0].1)).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = project();
    let output = sqlsentry(&["fix", ".", "--dry-run"], dir.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Would change"));
    for (name, target) in FIXTURES {
        let original = fs::read_to_string(fixture_dir().join(name)).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join(target)).unwrap(), original);
    }
}

#[test]
fn test_config_disables_detector_and_allow_lists() {
    let dir = project();
    let report = scan_json(dir.path());
    let xml_sign = report["findings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["detector"] == "mybatis-xml-sqli")
        .map(|f| f["fingerprint"].as_u64().unwrap())
        .unwrap();

    fs::write(
        dir.path().join("sqlsentry.toml"),
        format!(
            "[detectors.format-string-sqli]\nenabled = false\n\n[allowlist]\nfingerprints = [{xml_sign}]\n"
        ),
    )
    .unwrap();
    let report = scan_json(dir.path());
    let detectors = detectors_of(&report);
    assert!(!detectors.iter().any(|d| d == "format-string-sqli"));
    assert_eq!(detectors.iter().filter(|d| *d == "mybatis-xml-sqli").count(), 2);
}

#[test]
fn test_init_writes_default_config() {
    let dir = tempfile::Builder::new().prefix("sqlsentry-init").tempdir().unwrap();
    let output = sqlsentry(&["init", "."], dir.path());
    assert!(output.status.success());
    let written = fs::read_to_string(dir.path().join("sqlsentry.toml")).unwrap();
    assert!(written.contains("[sqli]"));

    // a second init keeps the existing file
    fs::write(dir.path().join("sqlsentry.toml"), "# mine\n").unwrap();
    assert!(sqlsentry(&["init", "."], dir.path()).status.success());
    assert_eq!(fs::read_to_string(dir.path().join("sqlsentry.toml")).unwrap(), "# mine\n");
}

#[test]
fn test_output_file() {
    let dir = project();
    let report_path = dir.path().join("report.json");
    let output = sqlsentry(
        &["scan", ".", "--format", "json", "--output", report_path.to_str().unwrap()],
        dir.path(),
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert!(parsed["findings"].as_array().unwrap().len() >= 8);
}
