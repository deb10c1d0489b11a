// Error handling tests: exit codes and messages for bad input

use acceptance_framework::*;
use assert_cmd::Command;
use predicates::prelude::*;

/// Command with HOME pointing at the context but no --user flag
fn bare_cmd(ctx: &AcceptanceTestContext) -> Command {
    let mut cmd = Command::cargo_bin("audino").unwrap();
    cmd.env("HOME", ctx.temp_dir().path());
    cmd
}

#[test]
fn test_missing_user_is_user_error() {
    let ctx = AcceptanceTestContext::new();

    bare_cmd(&ctx)
        .args(["projects", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: No user given"));
}

#[test]
fn test_user_from_rc_file() {
    let ctx = AcceptanceTestContext::new();
    let rc = ctx.temp_dir().path().join(".audino").join("rc");
    let mut content = std::fs::read_to_string(&rc).unwrap();
    content.push_str("user.id=7\n");
    std::fs::write(&rc, content).unwrap();

    bare_cmd(&ctx)
        .args(["projects", "add", "Archive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project 1: Archive"));

    bare_cmd(&ctx)
        .args(["projects", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"owner_id\": 7"));
}

#[test]
fn test_malformed_rc_is_internal_error() {
    let ctx = AcceptanceTestContext::new();
    let rc = ctx.temp_dir().path().join(".audino").join("rc");
    std::fs::write(&rc, "user.id=abc\n").unwrap();

    bare_cmd(&ctx)
        .args(["projects", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Internal error"))
        .stderr(predicate::str::contains("Invalid user.id on line 1"));
}

#[test]
fn test_unknown_task_is_not_found() {
    let ctx = AcceptanceTestContext::new();

    ctx.cmd()
        .args(["tasks", "show", "42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Task 42 not found"));
}

#[test]
fn test_non_positive_id_rejected() {
    let ctx = AcceptanceTestContext::new();

    ctx.cmd()
        .args(["jobs", "show", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IDs must be positive"));
}

#[test]
fn test_invalid_state_rejected_by_parser() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let task = given.task_with_labels(1, "Interview", &["speaker"]);
    let job = given.default_job_of(task);

    ctx.cmd()
        .args(["jobs", "update", &job.to_string(), "--state", "paused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid state: 'paused'"));
}

#[test]
fn test_malformed_annotation_payload() {
    let ctx = AcceptanceTestContext::new();
    let given = GivenBuilder::new(&ctx);
    let task = given.task_with_labels(1, "Interview", &["speaker"]);
    let job = given.default_job_of(task);

    ctx.cmd()
        .args(["annotations", "add", &job.to_string(), "{labels: oops"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid annotation payload"));
}

#[test]
fn test_personal_conflicts_with_org() {
    let ctx = AcceptanceTestContext::new();

    ctx.cmd()
        .args(["--personal", "--org", "3", "projects", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_entities_in_other_organization_look_missing() {
    let ctx = AcceptanceTestContext::new();

    let mut when = WhenBuilder::new(&ctx);
    when.execute_success(&["--org", "5", "tasks", "add", "Org task", "--label", "x", "--json"]);
    let task = when.json()["id"].as_i64().unwrap();

    ctx.cmd()
        .args(["tasks", "show", &task.to_string()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!("Task {} not found", task)));

    ctx.cmd()
        .args(["--org", "5", "tasks", "show", &task.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Org task"));
}

#[test]
fn test_label_name_too_long() {
    let ctx = AcceptanceTestContext::new();
    let name = "x".repeat(66);

    ctx.cmd()
        .args(["projects", "add", "Long labels", "--label", &name])
        .assert()
        .code(1);

    ctx.cmd()
        .args(["projects", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Long labels").not());
}
