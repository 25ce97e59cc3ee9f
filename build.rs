//! Build script stamping the source revision into the binaries
//!
//! `GIT_HASH` is logged by `scats-journey` at startup so a journey log can
//! be matched to the build that produced it.

use std::process::Command;

fn main() {
    // Short hash, suffixed with -dirty for uncommitted changes
    let output = Command::new("git").args(["describe", "--always", "--dirty", "--abbrev=7"]).output();

    let git_hash = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => String::from("unknown"),
    };

    println!("cargo:rustc-env=GIT_HASH={git_hash}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
