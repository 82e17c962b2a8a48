//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_studyclock"));
        cmd.env("STUDYCLOCK_DATA_DIR", self.path()).env_remove("RUST_LOG");
        cmd
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self.command().args(args).output().expect("run studyclock");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn ok(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "command {args:?} failed: {stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let stdout = self.ok(args);
        serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON from {args:?}: {e}\n{stdout}"))
    }

    fn run_with_input(&self, args: &[&str], input: &str) -> (String, String, i32) {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn studyclock");
        child
            .stdin
            .take()
            .expect("stdin")
            .write_all(input.as_bytes())
            .expect("write stdin");
        let output = child.wait_with_output().expect("wait for studyclock");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }
}

#[test]
fn test_config_defaults_and_set() {
    let sb = Sandbox::new();
    assert_eq!(sb.ok(&["config", "get", "timer.settle_delay_ms"]).trim(), "3500");
    sb.ok(&["config", "set", "timer.min_block_minutes", "10"]);
    assert_eq!(sb.ok(&["config", "get", "timer.min_block_minutes"]).trim(), "10");
    assert!(sb.path().join("config.toml").exists());

    let (_, stderr, code) = sb.run(&["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown config key"));

    sb.ok(&["config", "reset"]);
    assert_eq!(sb.ok(&["config", "get", "timer.min_block_minutes"]).trim(), "5");
}

#[test]
fn test_schedule_create_edit_and_activate() {
    let sb = Sandbox::new();
    let blocks = r#"[{"name":"Algebra","kind":"study","duration_min":40,"subject":"Maths"},
                     {"name":"Tea","kind":"break","duration_min":10}]"#;
    let created = sb.json(&["schedule", "create", "Evening", "--blocks", blocks]);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["blocks"].as_array().unwrap().len(), 2);

    let edited = sb.json(&[
        "schedule", "add-block", &id, "--name", "Optics", "--minutes", "30", "--subject", "Physics", "--at", "0",
    ]);
    assert_eq!(edited["blocks"][0]["name"], "Optics");

    let moved = sb.json(&["schedule", "move-block", &id, "0", "2"]);
    assert_eq!(moved["blocks"][2]["name"], "Optics");

    let removed = sb.json(&["schedule", "remove-block", &id, "1"]);
    assert_eq!(removed["blocks"].as_array().unwrap().len(), 2);

    sb.ok(&["schedule", "activate", &id]);
    let list = sb.json(&["schedule", "list"]);
    assert_eq!(list[0]["active"], true);
    assert_eq!(list[0]["total_minutes"], 70);

    let shown = sb.json(&["schedule", "show"]);
    assert_eq!(shown["id"], id.as_str());
}

#[test]
fn test_schedule_errors_exit_nonzero() {
    let sb = Sandbox::new();
    let (_, stderr, code) = sb.run(&["schedule", "activate", "sch_missing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("schedule not found"));

    let (_, stderr, code) = sb.run(&["run"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no active schedule"));
}

#[test]
fn test_seed_then_delete_active_reassigns() {
    let sb = Sandbox::new();
    sb.ok(&["schedule", "seed"]);
    let list = sb.json(&["schedule", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 3);
    assert_eq!(list[0]["name"], "JEE Preparation");
    assert_eq!(list[0]["active"], true);

    let first = list[0]["id"].as_str().unwrap().to_string();
    sb.ok(&["schedule", "delete", &first]);
    let list = sb.json(&["schedule", "list"]);
    assert_eq!(list[0]["name"], "Board Exam Schedule");
    assert_eq!(list[0]["active"], true);
}

#[test]
fn test_notes_lifecycle() {
    let sb = Sandbox::new();
    let first = sb.json(&["note", "add", "Revise optics formulas"]);
    sb.json(&["note", "add", "Buy graph paper"]);
    let id = first["id"].as_str().unwrap().to_string();

    assert!(sb.ok(&["note", "pin", &id]).contains("pinned"));
    let notes = sb.json(&["note", "list"]);
    assert_eq!(notes[0]["id"], id.as_str());
    assert_eq!(notes[0]["pinned"], true);

    sb.ok(&["note", "rm", &id]);
    assert_eq!(sb.json(&["note", "list"]).as_array().unwrap().len(), 1);
    let (_, _, code) = sb.run(&["note", "rm", &id]);
    assert_eq!(code, 1);
}

#[test]
fn test_login_and_streak() {
    let sb = Sandbox::new();
    assert_eq!(sb.ok(&["stats", "streak"]).trim(), "0");
    sb.ok(&["login", "record"]);
    sb.ok(&["login", "record"]);
    assert_eq!(sb.json(&["login", "list"]).as_array().unwrap().len(), 1);
    assert_eq!(sb.ok(&["stats", "streak"]).trim(), "1");
}

#[test]
fn test_run_skip_logs_partial_session() {
    let sb = Sandbox::new();
    let blocks = r#"[{"name":"Algebra","kind":"study","duration_min":40,"subject":"Maths"},
                     {"name":"Tea","kind":"break","duration_min":10}]"#;
    let created = sb.json(&["schedule", "create", "Evening", "--blocks", blocks]);
    let id = created["id"].as_str().unwrap().to_string();
    sb.ok(&["schedule", "activate", &id]);
    sb.ok(&["config", "set", "alerts.enabled", "false"]);

    let (stdout, stderr, code) = sb.run_with_input(&["run"], "s\n?\nq\n");
    assert_eq!(code, 0, "run failed: {stderr}");
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(events.iter().any(|e| e["type"] == "BlockStarted"));
    let skipped = events.iter().find(|e| e["type"] == "BlockSkipped").unwrap();
    assert_eq!(skipped["record"]["planned_minutes"], 40);
    assert_eq!(skipped["record"]["actual_minutes"], 0);
    assert_eq!(skipped["to_index"], 1);

    let today = sb.json(&["stats", "today"]);
    assert_eq!(today["study_sessions"], 1);
    assert_eq!(today["sessions"][0]["name"], "Algebra");
    assert_eq!(sb.ok(&["stats", "streak"]).trim(), "1");
}

#[test]
fn test_schedule_update_and_edit_block() {
    let sb = Sandbox::new();
    let blocks = r#"[{"name":"Algebra","kind":"study","duration_min":40,"subject":"Maths"},
                     {"name":"Tea","kind":"break","duration_min":10}]"#;
    let created = sb.json(&["schedule", "create", "Evening", "--blocks", blocks]);
    let id = created["id"].as_str().unwrap().to_string();
    let block_id = created["blocks"][1]["id"].as_str().unwrap().to_string();

    let updated = sb.json(&["schedule", "update", &id, "--description", "After dinner", "--color", "#aa3355"]);
    assert_eq!(updated["description"], "After dinner");
    assert_eq!(updated["color"], "#aa3355");
    assert_eq!(updated["name"], "Evening");

    let edited = sb.json(&[
        "schedule", "edit-block", &id, "1", "--name", "Optics", "--kind", "study", "--minutes", "25", "--subject",
        "Physics", "--notes", "Chapter 9",
    ]);
    let block = &edited["blocks"][1];
    assert_eq!(block["id"], block_id.as_str());
    assert_eq!(block["name"], "Optics");
    assert_eq!(block["kind"], "study");
    assert_eq!(block["duration_min"], 25);
    assert_eq!(block["subject"], "Physics");
    assert_eq!(block["notes"], "Chapter 9");
    assert_eq!(edited["blocks"][0]["name"], "Algebra");

    let shown = sb.json(&["schedule", "show", &id]);
    assert_eq!(shown["blocks"][1]["name"], "Optics");
    assert_eq!(shown["description"], "After dinner");

    let (_, stderr, code) = sb.run(&["schedule", "edit-block", &id, "5", "--name", "Nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("out of bounds"));
    let (_, _, code) = sb.run(&["schedule", "edit-block", &id, "0", "--minutes", "0"]);
    assert_eq!(code, 1);
    let (_, _, code) = sb.run(&["schedule", "update", &id]);
    assert_eq!(code, 1);
}

#[test]
fn test_export_writes_backup() {
    let sb = Sandbox::new();
    sb.ok(&["schedule", "seed"]);
    sb.json(&["note", "add", "Revise optics formulas"]);
    sb.ok(&["login", "record"]);

    let out = sb.path().join("studyclock_backup.json");
    let stdout = sb.ok(&["export", "--output", out.to_str().unwrap()]);
    assert!(stdout.contains("Exported 3 schedules"));

    let text = std::fs::read_to_string(&out).unwrap();
    let backup: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(backup["user_id"], "local");
    assert_eq!(backup["schedules"].as_array().unwrap().len(), 3);
    assert_eq!(backup["active_schedule_id"], backup["schedules"][0]["id"]);
    assert_eq!(backup["notes"][0]["text"], "Revise optics formulas");
    assert_eq!(backup["logins"].as_array().unwrap().len(), 1);
    assert!(backup["sessions"].as_array().unwrap().is_empty());

    let printed = sb.json(&["export"]);
    assert_eq!(printed["schedules"].as_array().unwrap().len(), 3);
}

#[test]
fn test_run_exits_when_input_closes_while_paused() {
    let sb = Sandbox::new();
    sb.ok(&["schedule", "seed"]);
    sb.ok(&["config", "set", "alerts.enabled", "false"]);

    let (stdout, stderr, code) = sb.run_with_input(&["run"], "p\n");
    assert_eq!(code, 0, "run failed: {stderr}");
    assert!(stdout.contains("TimerPaused"));
    assert!(stderr.contains("playback stopped"));

    let (_, stderr, code) = sb.run_with_input(&["run"], "x\n");
    assert_eq!(code, 0, "run failed: {stderr}");
    assert!(stderr.contains("playback stopped"));
    assert!(stderr.contains("last run started"));
}

#[test]
fn test_stats_week_has_seven_days() {
    let sb = Sandbox::new();
    let week = sb.json(&["stats", "week"]);
    assert_eq!(week.as_array().unwrap().len(), 7);
    assert!(sb.json(&["stats", "subjects", "--days", "30"]).as_array().unwrap().is_empty());
}
