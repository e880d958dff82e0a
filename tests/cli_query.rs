mod common;

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use common::{TestProject, ENV_VARS};
use predicates::prelude::*;

#[test]
fn help_lists_commands() {
    let project = TestProject::new();

    project
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("worker"))
        .stdout(predicate::str::contains("load"))
        .stdout(predicate::str::contains("query"));
}

#[test]
fn query_unreachable_server_fails() {
    let project = TestProject::new();

    project
        .command()
        .args(["query", "마늘 체험", "--server", "http://127.0.0.1:19995"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect"));
}

/// Kills the server when the test ends, pass or fail
struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("failed to reserve a port")
}

#[test]
fn query_against_seeded_server() {
    let project = TestProject::new();
    let fixture = project.write_tour_fixture();
    let port = free_port();

    let mut serve = Command::new(TestProject::uscheck_bin());
    serve
        .current_dir(project.path())
        .args(["--quiet", "serve", "--host", "127.0.0.1", "--port"])
        .arg(port.to_string())
        .arg("--seed")
        .arg(&fixture)
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    for var in ENV_VARS {
        serve.env_remove(var);
    }
    let _server = ServerGuard(serve.spawn().expect("failed to start server"));

    let server_url = format!("http://127.0.0.1:{port}");
    let deadline = Instant::now() + Duration::from_secs(20);
    let output = loop {
        let output = project
            .command()
            .args(["--json", "query", "빙계계곡 가는 길", "--server", &server_url])
            .output()
            .expect("failed to run uscheck query");
        if output.status.success() || Instant::now() > deadline {
            break output;
        }
        sleep(Duration::from_millis(200));
    };
    assert!(
        output.status.success(),
        "query failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let rec: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON output");
    assert_eq!(rec["success"], true);
    assert_eq!(rec["ai_used"], false);
    assert_eq!(rec["analysis"]["keywords"], serde_json::json!(["빙계계곡"]));
    assert_eq!(rec["recommended_spots"][0]["contentid"], "126");
    assert_eq!(rec["recommended_spots"][0]["price"], "0");
}
