//! Integration tests for the chaincall binary.
//!
//! These tests run the CLI against temporary config and schema files. None
//! of them reach the network.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const SCHEMA: &str = r#"{
    "threads": {
        "details": { "required": ["thread", "forum"], "method": "GET" },
        "list": { "method": "GET" }
    },
    "posts": {
        "create": { "required": ["message", "author_email:string"], "method": "POST" }
    }
}"#;

/// A temp dir holding `config.toml` (file cache under `cache/`) and
/// `interfaces.json`.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        dir.child("interfaces.json").write_str(SCHEMA).unwrap();
        let cache_dir = dir.child("cache");
        dir.child("config.toml")
            .write_str(&format!(
                r#"
                host = "http://127.0.0.1:1"
                schema_path = "interfaces.json"

                [cache]
                namespace = "test"
                backend = "file"
                dir = "{}"
                "#,
                cache_dir.path().display()
            ))
            .unwrap();
        Self { dir }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("chaincall").unwrap();
        cmd.arg("--config")
            .arg(self.dir.child("config.toml").path())
            .env_remove("CHAINCALL_SECRET_KEY")
            .env_remove("CHAINCALL_PUBLIC_KEY")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("chaincall")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chaincall"));
}

mod schema {
    use super::*;

    #[test]
    fn lists_declared_endpoints() {
        Fixture::new()
            .cmd()
            .arg("schema")
            .assert()
            .success()
            .stdout(predicate::str::contains("posts.create"))
            .stdout(predicate::str::contains("threads.details"))
            .stdout(predicate::str::contains("threads.list"));
    }

    #[test]
    fn describes_one_endpoint() {
        Fixture::new()
            .cmd()
            .args(["schema", "posts.create"])
            .assert()
            .success()
            .stdout(predicate::str::contains("method: POST"))
            .stdout(predicate::str::contains("author_email:string"));
    }

    #[test]
    fn undeclared_endpoint_fails() {
        Fixture::new()
            .cmd()
            .args(["schema", "users.details"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not declared"));
    }

    #[test]
    fn schema_flag_overrides_config() {
        let fixture = Fixture::new();
        fixture
            .dir
            .child("other.json")
            .write_str(r#"{"users": {"details": {"method": "GET"}}}"#)
            .unwrap();
        fixture
            .cmd()
            .arg("--schema")
            .arg(fixture.dir.child("other.json").path())
            .arg("schema")
            .assert()
            .success()
            .stdout(predicate::str::contains("users.details"))
            .stdout(predicate::str::contains("threads").not());
    }
}

mod call {
    use super::*;

    #[test]
    fn missing_required_argument_fails_locally() {
        Fixture::new()
            .cmd()
            .args(["call", "threads.details", "-p", "forum=f"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing required argument: thread"));
    }

    #[test]
    fn undeclared_endpoint_needs_method() {
        Fixture::new()
            .cmd()
            .args(["call", "users.details", "-p", "user=1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("interface is not defined for 'users.details'"));
    }

    #[test]
    fn malformed_param_fails() {
        Fixture::new()
            .cmd()
            .args(["call", "threads.list", "-p", "oops"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("KEY=VALUE"));
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        Fixture::new()
            .cmd()
            .args(["call", "threads.list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("transport error"));
    }
}

mod cache {
    use super::*;

    #[test]
    fn put_persists_between_runs() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["cache", "put", "Recent", "comment", r#"[{"id": 1}]"#])
            .assert()
            .success()
            .stdout(predicate::str::contains("Stored test:Recent.comment"));

        fixture
            .cmd()
            .args(["cache", "get", "Recent", "comment"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"id\": 1"));

        fixture
            .cmd()
            .args(["cache", "list", "Recent"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"comment\""));
    }

    #[test]
    fn get_missing_fails() {
        Fixture::new()
            .cmd()
            .args(["cache", "get", "Recent", "nothing"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache entry"));
    }

    #[test]
    fn quiet_suppresses_output() {
        Fixture::new()
            .cmd()
            .args(["-q", "cache", "put", "T", "1", "true"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }
}

mod config {
    use super::*;

    #[test]
    fn unknown_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        dir.child("config.toml").write_str("hots = \"x\"").unwrap();
        Command::cargo_bin("chaincall")
            .unwrap()
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("schema")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load config"));
    }

    #[test]
    fn thread_without_forum_fails() {
        Fixture::new()
            .cmd()
            .args(["thread", "https://example.com/post"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No forum given"));
    }

    #[test]
    fn recent_without_forum_fails() {
        Fixture::new()
            .cmd()
            .args(["recent", "--limit", "5"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No forum given"));
    }

    #[test]
    fn post_without_forum_fails() {
        Fixture::new()
            .cmd()
            .args([
                "post",
                "https://example.com/post",
                "--name",
                "Ada",
                "--email",
                "ada@example.com",
                "--message",
                "hi",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No forum given"));
    }

    #[test]
    fn recent_with_forum_reaches_transport() {
        Fixture::new()
            .cmd()
            .args(["recent", "--forum", "myforum"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("transport error"));
    }
}

#[test]
fn completion_generates_script() {
    Command::cargo_bin("chaincall")
        .unwrap()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chaincall"));
}
