use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::{NamedTempFile, TempDir};

const CATALOG: &str = r#"{
    "acme": [
        {"id": "small", "max_input_tokens": 100},
        {"id": "large", "max_input_tokens": 1000}
    ]
}"#;

struct Fixture {
    config_home: TempDir,
    catalog: NamedTempFile,
}

impl Fixture {
    fn new() -> Self {
        let mut catalog = NamedTempFile::new().unwrap();
        catalog.write_all(CATALOG.as_bytes()).unwrap();
        Self {
            config_home: TempDir::new().unwrap(),
            catalog,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tokenmeter"));
        cmd.env("XDG_CONFIG_HOME", self.config_home.path())
            .env_remove("RUST_LOG")
            .env("TOKENMETER_DEBOUNCE_MS", "20")
            .env_remove("TOKENMETER_CATALOG_PATH")
            .env_remove("TOKENMETER_LIMITING_RATIO");
        cmd
    }

    fn report(&self, args: &[&str]) -> Output {
        self.command()
            .arg("report")
            .arg("--offline")
            .arg("--catalog")
            .arg(self.catalog.path())
            .args(args)
            .output()
            .expect("failed to run tokenmeter binary")
    }
}

#[test]
fn cli_help_succeeds() {
    let out = Fixture::new().command().arg("--help").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("report"));
    assert!(stdout.contains("watch"));
}

#[test]
fn report_text_output() {
    let out = Fixture::new().report(&["-m", "small", "--text", &"a".repeat(200)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(
        stdout.trim(),
        "[normal] 50% of the input limit used (50 / 100 tokens) (approximate)"
    );
}

#[test]
fn report_json_names_limiting_model() {
    let args = ["--json", "-m", "large", "-m", "small", "--text", "abcdefgh"];
    let out = Fixture::new().report(&args);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["min_limit"], 100);
    assert_eq!(v["limiting_model_id"], "small");
    assert_eq!(v["current_input_tokens"], 2);
    assert_eq!(v["level"], "normal");
    assert_eq!(v["is_accurate"], false);
}

#[test]
fn report_from_text_file() {
    let fixture = Fixture::new();
    let mut draft = NamedTempFile::new().unwrap();
    draft.write_all("x".repeat(400).as_bytes()).unwrap();
    let path = draft.path().to_str().unwrap().to_string();
    let out = fixture.report(&["--json", "-m", "small", "--text-file", &path]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["total_tokens"], 100);
    assert_eq!(v["is_exceeded"], false);
    assert_eq!(v["level"], "critical");
}

#[test]
fn exceeded_with_gate_exits_2() {
    let fixture = Fixture::new();
    let text = "y".repeat(404);

    let out = fixture.report(&["-m", "small", "--text", &text]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("exceeds the limit by 1 tokens"));

    let out = fixture.report(&["--fail-on-exceeded", "-m", "small", "--text", &text]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn unknown_model_fails() {
    let out = Fixture::new().report(&["-m", "ghost", "--text", "hi"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("ghost"), "{stderr}");
}

#[test]
fn watch_reads_drafts_from_stdin() {
    let fixture = Fixture::new();
    let mut child = fixture
        .command()
        .arg("watch")
        .arg("--offline")
        .arg("--catalog")
        .arg(fixture.catalog.path())
        .args(["--json", "-m", "small"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, "hello").unwrap();
        writeln!(stdin, "{}", "z".repeat(80)).unwrap();
    }
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let last: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(last["current_input_tokens"], 20);
    assert_eq!(last["is_pending"], false);
}
