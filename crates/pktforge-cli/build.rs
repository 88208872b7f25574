use std::env;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for var in ["GITHUB_SHA", "PKTFORGE_COMMIT", "SOURCE_DATE_EPOCH"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // Release tarballs carry no .git, so packagers may pin the commit.
    let commit = ["PKTFORGE_COMMIT", "GITHUB_SHA"]
        .into_iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .map(|full| full.trim().chars().take(7).collect::<String>())
        .or_else(|| git(&["rev-parse", "--short=7", "HEAD"]))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let dirty = git(&["status", "--porcelain", "--untracked-files=no"]).is_some();
    let commit = if dirty && commit != UNKNOWN {
        format!("{commit}-dirty")
    } else {
        commit
    };

    let date = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .filter(|v| v.parse::<u64>().is_ok())
        .map(|epoch| format!("@{epoch}"))
        .or_else(|| git(&["log", "-1", "--format=%cs"]))
        .unwrap_or_else(|| UNKNOWN.to_string());

    println!("cargo:rustc-env=PKTFORGE_BUILD_COMMIT={commit}");
    println!("cargo:rustc-env=PKTFORGE_BUILD_DATE={date}");
}

/// Trimmed stdout of a successful git call, `None` when git fails or prints nothing.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
