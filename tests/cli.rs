use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn fuse_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fuse"))
}

#[test]
fn cli_writes_framed_output_with_header() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_file(&src.path().join("main.rs"), "fn main() {}\n");
    write_file(&src.path().join("lib/util.rs"), "pub fn util() {}\n");

    let output = fuse_cmd()
        .args([
            src.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--name",
            "ctx",
            "--split-tokens",
            "0",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = fs::read_to_string(out.path().join("ctx.txt")).unwrap();
    assert!(text.starts_with("# FUSE CONTEXT\n"));
    assert!(text.contains("<|main.rs|>"));
    assert!(text.contains("<|lib/util.rs|>"));
    assert!(text.contains("<|/|>"));
}

#[test]
fn cli_respects_gitignore_end_to_end() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::create_dir_all(src.path().join(".git")).unwrap();
    write_file(&src.path().join(".gitignore"), "generated/\n*.log\n");
    write_file(&src.path().join("kept.rs"), "pub fn kept() {}\n");
    write_file(&src.path().join("generated/out.rs"), "pub fn gen() {}\n");
    write_file(&src.path().join("trace.log"), "noise noise noise\n");

    let output = fuse_cmd()
        .args([
            src.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--name",
            "ctx",
            "--split-tokens",
            "0",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = fs::read_to_string(out.path().join("ctx.txt")).unwrap();
    assert!(text.contains("<|kept.rs|>"));
    assert!(!text.contains("generated/out.rs"));
    assert!(!text.contains("trace.log"));
}

#[test]
fn cli_relative_source_honors_ancestor_gitignore() {
    let repo = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::create_dir_all(repo.path().join(".git")).unwrap();
    write_file(&repo.path().join(".gitignore"), "*.log\n");
    write_file(&repo.path().join("sub/kept.rs"), "pub fn kept() {}\n");
    write_file(&repo.path().join("sub/noise.log"), "noise noise noise\n");

    // Source `.` from inside the subdirectory; the rule lives at the
    // repository root above it.
    let output = fuse_cmd()
        .current_dir(repo.path().join("sub"))
        .args([
            ".",
            "--output-dir",
            out.path().to_str().unwrap(),
            "--name",
            "ctx",
            "--split-tokens",
            "0",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = fs::read_to_string(out.path().join("ctx.txt")).unwrap();
    assert!(text.contains("<|kept.rs|>"));
    assert!(!text.contains("noise.log"));
}

#[test]
fn cli_split_produces_part_files() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    // ~250 tokens each under cl100k; a 100-token threshold forces one
    // part per file.
    let body = "let value = compute_something_interesting();\n".repeat(25);
    write_file(&src.path().join("a.rs"), &body);
    write_file(&src.path().join("b.rs"), &body);

    let output = fuse_cmd()
        .args([
            src.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--name",
            "ctx",
            "--split-tokens",
            "100",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let part1 = fs::read_to_string(out.path().join("ctx_part1.txt")).unwrap();
    let part2 = fs::read_to_string(out.path().join("ctx_part2.txt")).unwrap();
    assert!(part1.contains("# Part: 1"));
    assert!(part1.contains("<|a.rs|>"));
    assert!(part2.contains("# Part: 2"));
    assert!(part2.contains("<|b.rs|>"));
}

#[test]
fn cli_output_conflict_without_overwrite_fails() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_file(&src.path().join("a.rs"), "fn a() {}\n");
    write_file(&out.path().join("ctx.txt"), "precious");

    let output = fuse_cmd()
        .args([
            src.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--name",
            "ctx",
            "--split-tokens",
            "0",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(
        fs::read_to_string(out.path().join("ctx.txt")).unwrap(),
        "precious"
    );
}

#[test]
fn cli_rerun_with_overwrite_is_byte_identical() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_file(&src.path().join("a.rs"), "pub fn a() {}\n");
    write_file(&src.path().join("b.rs"), "pub fn b() {}\n");

    let args = [
        src.path().to_str().unwrap(),
        "--output-dir",
        out.path().to_str().unwrap(),
        "--name",
        "ctx",
        "--split-tokens",
        "0",
        "--no-metadata",
        "--overwrite",
    ];
    assert!(fuse_cmd().args(args).output().unwrap().status.success());
    let first = fs::read(out.path().join("ctx.txt")).unwrap();
    assert!(fuse_cmd().args(args).output().unwrap().status.success());
    let second = fs::read(out.path().join("ctx.txt")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn cli_max_tokens_stops_early_with_success() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let body = "let value = compute_something_interesting();\n".repeat(25);
    write_file(&src.path().join("a.rs"), &body);
    write_file(&src.path().join("b.rs"), &body);

    let output = fuse_cmd()
        .args([
            src.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--name",
            "ctx",
            "--split-tokens",
            "0",
            "--max-tokens",
            "400",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v.get("stopped_early").unwrap().as_bool(), Some(true));
    assert_eq!(v.get("files_written").unwrap().as_u64(), Some(1));

    let text = fs::read_to_string(out.path().join("ctx.txt")).unwrap();
    assert!(text.contains("<|a.rs|>"));
    assert!(!text.contains("<|b.rs|>"));
}

#[test]
fn cli_template_filters_extensions() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_file(&src.path().join("main.rs"), "fn main() {}\n");
    write_file(&src.path().join("notes.md"), "# notes\nsome text\n");

    let output = fuse_cmd()
        .args([
            src.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--name",
            "ctx",
            "--split-tokens",
            "0",
            "--template",
            "rust",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = fs::read_to_string(out.path().join("ctx.txt")).unwrap();
    assert!(text.contains("<|main.rs|>"));
    assert!(!text.contains("notes.md"));
}

#[test]
fn cli_missing_source_exits_with_code_3() {
    let out = tempdir().unwrap();
    let output = fuse_cmd()
        .args([
            "/nonexistent/fuse-cli-src",
            "--output-dir",
            out.path().to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));

    let stderr = String::from_utf8(output.stderr).unwrap();
    let _: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
}
