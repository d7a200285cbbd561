//! End-to-end runs of the `splitfetch` binary in an isolated home.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Test context with an isolated configuration directory and no tools
struct TestContext {
    temp_dir: TempDir,
    home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let home = temp_dir.path().join("splitfetch");
        Self { temp_dir, home }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_splitfetch"));
        cmd.current_dir(self.temp_dir.path());
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("SPLITFETCH_HOME", &self.home);
        cmd.env("SPLITFETCH_JAVA", self.temp_dir.path().join("no-java"));
        cmd.env("SPLITFETCH_ADB", self.temp_dir.path().join("no-adb"));
        cmd.env_remove("SPLITFETCH_METHOD");
        for proxy in ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"] {
            cmd.env_remove(proxy);
        }
        cmd
    }

    fn write_reply(&self, base_url: &str) {
        let reply = format!(r#"{{"fullPathUrls": ["{base_url}"], "splits": []}}"#);
        std::fs::write(self.temp_dir.path().join("reply.json"), reply).unwrap();
    }
}

/// Serve `body` to a single request on a local port.
fn serve_once(body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
            line.clear();
        }
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .unwrap();
        stream.write_all(body).unwrap();
    });
    format!("http://{addr}/base.apk")
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.cmd().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("fetch"));
    assert!(stdout.contains("check"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.cmd().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_dir_honours_override() {
    let ctx = TestContext::new();
    let output = ctx.cmd().arg("config-dir").output().expect("failed to run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        ctx.home.display().to_string()
    );

    let output = ctx
        .cmd()
        .args(["config-dir", "--tools"])
        .output()
        .expect("failed to run");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        ctx.home.join("tools").display().to_string()
    );
}

#[test]
fn test_check_reports_all_methods() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .args(["check", "--json"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let methods = report["methods"].as_array().unwrap();
    assert_eq!(methods.len(), 5);
    assert_eq!(methods[0]["strategy"], "xapk-bundle");
    assert_eq!(methods[0]["available"], true);
    assert_eq!(methods[3]["strategy"], "adb-install");
    assert_eq!(methods[3]["available"], false);
    assert_eq!(report["dependencies"].as_array().unwrap().len(), 5);
}

#[test]
fn test_fetch_rejects_unknown_method() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .args(["fetch", "com.example", "--reply", "reply.json", "--method", "9"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown merge strategy"));
}

#[test]
fn test_fetch_with_missing_reply_fails() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .args(["fetch", "com.example", "--reply", "missing.json"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read store reply"));
}

#[test]
fn test_fetch_with_reply_without_links_fails() {
    let ctx = TestContext::new();
    std::fs::write(ctx.temp_dir.path().join("reply.json"), r#"{"status": "ok"}"#).unwrap();
    let output = ctx
        .cmd()
        .args(["fetch", "com.example", "--reply", "reply.json", "--no-interactive"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no usable download links"));
}

#[test]
fn test_fetch_single_package_reports_once() {
    let ctx = TestContext::new();
    ctx.write_reply(&serve_once(b"BASE"));

    let output = ctx
        .cmd()
        .args(["fetch", "com.example", "--reply", "reply.json", "-o", "out", "--no-interactive"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let saved = ctx.temp_dir.path().join("out").join("com.example.apk");
    assert_eq!(std::fs::read(&saved).unwrap(), b"BASE");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("com.example.apk").count(), 1, "{stdout}");
}

#[test]
fn test_fetch_failure_is_reported() {
    let ctx = TestContext::new();
    // Bind and release a port so the download is refused
    let closed = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    ctx.write_reply(&format!("http://{closed}/base.apk"));

    let output = ctx
        .cmd()
        .args(["fetch", "com.example", "--reply", "reply.json", "--no-interactive"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Could not fetch com.example"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to fetch com.example"));
}
