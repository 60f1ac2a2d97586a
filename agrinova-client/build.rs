use std::process::Command;

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
}

fn main() {
    // Capture git commit hash for version info
    let git_commit =
        command_output("git", &["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let is_dirty = command_output("git", &["status", "--porcelain"])
        .map(|s| !s.is_empty())
        .unwrap_or(false);
    let git_commit = if is_dirty {
        format!("{git_commit}-dirty")
    } else {
        git_commit
    };
    println!("cargo:rustc-env=GIT_COMMIT={git_commit}");

    // "rustc 1.85.0 (4d91de4e4 2025-02-17)" -> "1.85.0"
    let rustc_version = command_output("rustc", &["--version"])
        .and_then(|s| s.split_whitespace().nth(1).map(str::to_string))
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=RUSTC_VERSION={rustc_version}");

    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs");
}
