// CLI integration tests for the reader -> parser -> renderer pipeline.
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_chartpipe");
    Command::new(exe)
}

fn run_with_stdin(args: &[&str], stdin_data: &str) -> std::process::Output {
    let mut child = cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(stdin_data.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait")
}

fn json_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}

#[test]
fn json_output_with_explicit_format() {
    let output = run_with_stdin(
        &["--output", "json", "--format", "fs", "--separator", ","],
        "1.0,hello\n2.0,world\n",
    );
    assert!(output.status.success());

    let rows = json_lines(&output.stdout);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["numbers"][0], 1.0);
    assert_eq!(rows[0]["texts"][0], "hello");
    assert_eq!(rows[1]["numbers"][0], 2.0);
    assert_eq!(rows[1]["texts"][0], "world");
}

#[test]
fn json_output_with_inferred_format() {
    let output = run_with_stdin(
        &["--output", "json", "--separator", ","],
        "1,a\n2,b\n3,c\n4,d\n5,e\n6,f\n",
    );
    assert!(output.status.success());

    // Six rows in input order: five sampled-then-replayed, one streamed
    // through the frozen format.
    let rows = json_lines(&output.stdout);
    assert_eq!(rows.len(), 6);
    let numbers: Vec<f64> = rows
        .iter()
        .map(|row| row["numbers"][0].as_f64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn malformed_lines_are_dropped_without_halting() {
    let output = run_with_stdin(
        &["--output", "json", "--format", "ff", "--separator", ","],
        "1.0,2.0\n1.0\n3.0,4.0\n",
    );
    assert!(output.status.success());

    let rows = json_lines(&output.stdout);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["numbers"][0], 3.0);
    assert_eq!(rows[1]["numbers"][1], 4.0);
}

#[test]
fn dates_are_validated_and_kept_as_text() {
    let output = run_with_stdin(
        &[
            "--output",
            "json",
            "--separator",
            ",",
            "--date-format",
            "[year]-[month]-[day]",
        ],
        "2021-01-01,10.5\n",
    );
    assert!(output.status.success());

    let rows = json_lines(&output.stdout);
    assert_eq!(rows[0]["timestamps"][0], "2021-01-01");
    assert_eq!(rows[0]["numbers"][0], 10.5);
}

#[test]
fn reads_from_a_file_argument() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("data.csv");
    std::fs::write(&path, "1.0,hello\n").expect("write data");

    let output = cmd()
        .args([
            path.to_str().unwrap(),
            "--output",
            "json",
            "--separator",
            ",",
        ])
        .output()
        .expect("run");
    assert!(output.status.success());

    let rows = json_lines(&output.stdout);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["texts"][0], "hello");
}

#[test]
fn chartjs_output_writes_a_html_page() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out_path = temp.path().join("chart.html");

    let output = run_with_stdin(
        &[
            "--separator",
            ",",
            "--title",
            "Test Chart",
            "--out",
            out_path.to_str().unwrap(),
        ],
        "1.0,a\n2.0,b\n",
    );
    assert!(output.status.success());

    let page = std::fs::read_to_string(&out_path).expect("read page");
    assert!(page.contains("<canvas id=\"chart\"></canvas>"));
    assert!(page.contains("Test Chart"));
    assert!(page.contains("new Chart"));
}

#[test]
fn d3_output_writes_a_html_page() {
    let output = run_with_stdin(
        &["--output", "d3", "--separator", ",", "--chart-type", "bar"],
        "3.0,apples\n1.0,pears\n",
    );
    assert!(output.status.success());

    let page = String::from_utf8_lossy(&output.stdout);
    assert!(page.contains("d3.v7.min.js"));
    assert!(page.contains(r#""label":"apples""#));
}

#[test]
fn unknown_output_fails_with_not_found_exit_code() {
    let output = run_with_stdin(&["--output", "gnuplot"], "");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown output"));
    assert!(stderr.contains("chartjs, d3, json"));
}

#[test]
fn invalid_format_string_fails_with_usage_exit_code() {
    let output = run_with_stdin(&["--output", "json", "--format", "fx"], "");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_input_file_fails_with_io_exit_code() {
    let output = cmd()
        .args(["/no/such/file.csv", "--output", "json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn empty_input_produces_empty_output() {
    let output = run_with_stdin(&["--output", "json", "--separator", ","], "");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn tab_separator_escape_is_accepted() {
    let output = run_with_stdin(
        &["--output", "json", "--separator", "\\t"],
        "1.0\thello\n",
    );
    assert!(output.status.success());
    let rows = json_lines(&output.stdout);
    assert_eq!(rows[0]["numbers"][0], 1.0);
    assert_eq!(rows[0]["texts"][0], "hello");
}
