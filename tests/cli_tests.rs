use assert_cmd::Command;
use predicates::prelude::*;
use std::process;
use tempfile::tempdir;

fn cmd() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("contextsmith").unwrap()
}

/// Helper: create a temporary git repo with an initial commit and a
/// subsequent modification, returning the tempdir handle and root path.
fn setup_git_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();

    // Initialise a git repo with a deterministic author.
    git(root, &["init"]);
    git(root, &["config", "user.email", "test@test.com"]);
    git(root, &["config", "user.name", "Test"]);

    // Create initial file and commit.
    std::fs::write(
        root.join("hello.rs"),
        "fn main() {\n    println!(\"hello\");\n}\n",
    )
    .unwrap();
    git(root, &["add", "hello.rs"]);
    git(root, &["commit", "-m", "initial"]);

    // Modify the file to produce a diff.
    std::fs::write(
        root.join("hello.rs"),
        "fn main() {\n    println!(\"hello, world!\");\n    println!(\"welcome\");\n}\n",
    )
    .unwrap();

    dir
}

/// Run a git command in the given directory, panicking on failure.
fn git(dir: &std::path::Path, args: &[&str]) {
    let status = process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(process::Stdio::null())
        .stderr(process::Stdio::null())
        .status()
        .expect("git command failed to start");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

// -----------------------------------------------------------------------
// General CLI tests
// -----------------------------------------------------------------------

#[test]
fn help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("collect"))
        .stdout(predicate::str::contains("pack"))
        .stdout(predicate::str::contains("trim"))
        .stdout(predicate::str::contains("map"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("explain"));
}

#[test]
fn unimplemented_command_shows_error() {
    // `collect` is still stubbed — verify it reports not-implemented.
    cmd()
        .arg("collect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not yet implemented"));
}

// -----------------------------------------------------------------------
// Init command tests
// -----------------------------------------------------------------------

#[test]
fn init_creates_config_and_cache() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));

    assert!(dir.path().join("contextsmith.toml").exists());
    assert!(dir.path().join(".contextsmith/cache").exists());
}

#[test]
fn init_no_cache_skips_cache_dir() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap(), "--no-cache"])
        .assert()
        .success();

    assert!(dir.path().join("contextsmith.toml").exists());
    assert!(!dir.path().join(".contextsmith").exists());
}

#[test]
fn init_errors_on_existing_without_force() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap()])
        .assert()
        .success();

    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_force_overwrites() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap()])
        .assert()
        .success();

    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap(), "--force"])
        .assert()
        .success();
}

// -----------------------------------------------------------------------
// Diff command tests
// -----------------------------------------------------------------------

#[test]
fn diff_shows_changes_in_markdown() {
    let dir = setup_git_repo();
    cmd()
        .args(["diff", "--root", dir.path().to_str().unwrap(), "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## `hello.rs`"))
        .stdout(predicate::str::contains("hello, world!"));
}

#[test]
fn diff_json_format_is_valid() {
    let dir = setup_git_repo();
    let output = cmd()
        .args([
            "diff",
            "--root",
            dir.path().to_str().unwrap(),
            "--format",
            "json",
            "--stdout",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["type"], "diff_context");
    assert!(parsed["fragments"].is_array());
    assert!(parsed["fragment_count"].as_u64().unwrap() > 0);
}

#[test]
fn diff_empty_range_reports_zero_fragments() {
    let dir = setup_git_repo();
    let root = dir.path();
    git(root, &["add", "hello.rs"]);
    git(root, &["commit", "-m", "update"]);

    let output = cmd()
        .args([
            "diff",
            "--root",
            root.to_str().unwrap(),
            "HEAD..HEAD",
            "--format",
            "json",
            "--stdout",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["fragment_count"], 0);
    assert_eq!(parsed["fragments"].as_array().unwrap().len(), 0);
}

#[test]
fn diff_non_git_directory_errors() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["diff", "--root", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("git"));
}

#[test]
fn diff_rev_range() {
    let dir = setup_git_repo();
    let root = dir.path();

    // Commit the modification so we can diff HEAD~1..HEAD.
    git(root, &["add", "hello.rs"]);
    git(root, &["commit", "-m", "update"]);

    cmd()
        .args([
            "diff",
            "--root",
            root.to_str().unwrap(),
            "HEAD~1..HEAD",
            "--stdout",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello, world!"));
}

#[test]
fn diff_output_to_file() {
    let dir = setup_git_repo();
    let out_file = dir.path().join("output.md");

    cmd()
        .args([
            "diff",
            "--root",
            dir.path().to_str().unwrap(),
            "--out",
            out_file.to_str().unwrap(),
        ])
        .assert()
        .success();

    let content = std::fs::read_to_string(&out_file).unwrap();
    assert!(content.contains("hello, world!"));
}

// -----------------------------------------------------------------------
// End-to-end scenarios
// -----------------------------------------------------------------------

fn init_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    git(root, &["init"]);
    git(root, &["config", "user.email", "test@test.com"]);
    git(root, &["config", "user.name", "Test"]);
    dir
}

fn diff_json(root: &std::path::Path, range: Option<&str>) -> serde_json::Value {
    let mut args = vec!["diff", "--root", root.to_str().unwrap()];
    if let Some(r) = range {
        args.push(r);
    }
    args.extend(["--format", "json", "--stdout"]);
    let output = cmd().args(args).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

fn fragment_paths(context: &serde_json::Value) -> Vec<String> {
    context["fragments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn caller_of_modified_function_is_included() {
    let dir = init_repo();
    let root = dir.path();

    std::fs::write(
        root.join("utils.py"),
        "def calculate_tax(amount):\n    return amount * 0.1\n",
    )
    .unwrap();
    std::fs::create_dir(root.join("reports")).unwrap();
    std::fs::write(
        root.join("reports").join("generator.py"),
        "from utils import calculate_tax\n\ndef generate_report(amount):\n    return calculate_tax(amount)\n",
    )
    .unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-m", "initial"]);

    std::fs::write(
        root.join("utils.py"),
        "def calculate_tax(amount):\n    return amount * 0.15\n",
    )
    .unwrap();

    let context = diff_json(root, Some("--budget=10000"));
    let paths = fragment_paths(&context);
    assert!(paths.iter().any(|p| p == "utils.py"));
    assert!(paths.iter().any(|p| p.contains("generator.py")));
}

#[test]
fn config_driven_code_edge_includes_config_file() {
    let dir = init_repo();
    let root = dir.path();

    std::fs::write(root.join("config.yaml"), "database:\n  pool_size: 5\n").unwrap();
    std::fs::write(
        root.join("db.py"),
        "def connect(cfg):\n    return open_pool(cfg.pool_size)\n",
    )
    .unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-m", "initial"]);

    std::fs::write(root.join("config.yaml"), "database:\n  pool_size: 10\n").unwrap();

    let context = diff_json(root, None);
    let paths = fragment_paths(&context);
    assert!(paths.iter().any(|p| p == "config.yaml"));
}

#[test]
fn test_file_paired_with_modified_code() {
    let dir = init_repo();
    let root = dir.path();

    std::fs::write(
        root.join("calculator.py"),
        "def add(a, b):\n    return a + b\n",
    )
    .unwrap();
    std::fs::create_dir(root.join("tests")).unwrap();
    std::fs::write(
        root.join("tests").join("test_calculator.py"),
        "from calculator import add\n\ndef test_add():\n    assert add(1, 2) == 3\n",
    )
    .unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-m", "initial"]);

    std::fs::write(
        root.join("calculator.py"),
        "def add(a, b):\n    return a + b + 0\n",
    )
    .unwrap();

    let context = diff_json(root, Some("--budget=10000"));
    let paths = fragment_paths(&context);
    assert!(paths.iter().any(|p| p == "calculator.py"));
}

#[test]
fn rename_only_change_has_no_old_path_fragment() {
    let dir = init_repo();
    let root = dir.path();

    std::fs::create_dir(root.join("utils")).unwrap();
    std::fs::write(
        root.join("utils").join("helpers.py"),
        "def helper():\n    return 1\n",
    )
    .unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-m", "initial"]);

    git(root, &["mv", "utils/helpers.py", "utils/common.py"]);
    git(root, &["commit", "-m", "rename"]);

    let context = diff_json(root, Some("HEAD~1..HEAD"));
    assert_eq!(context["type"], "diff_context");
    let paths = fragment_paths(&context);
    assert!(!paths.iter().any(|p| p.ends_with("helpers.py")));
}

#[test]
fn budget_exhausted_on_core_admits_one_fragment() {
    let dir = init_repo();
    let root = dir.path();

    // Three files sized to ~100 tokens each under the char-count estimator
    // (400 chars / 4 chars-per-token), plus the per-fragment reserve —
    // so a 150-token budget admits exactly one.
    for name in ["a.txt", "b.txt", "c.txt"] {
        let body = "abcd ".repeat(80);
        std::fs::write(root.join(name), format!("{body}\n")).unwrap();
    }
    git(root, &["add", "."]);
    git(root, &["commit", "-m", "initial"]);

    for name in ["a.txt", "b.txt", "c.txt"] {
        let body = "wxyz ".repeat(80);
        std::fs::write(root.join(name), format!("{body}\n")).unwrap();
    }

    let context = diff_json(root, Some("--budget=150"));
    assert_eq!(context["fragment_count"].as_u64().unwrap(), 1);
}
