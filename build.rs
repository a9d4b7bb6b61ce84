//! Stamps the build with `MODFS_VERSION`.
use std::process::Command;

#[allow(clippy::print_stdout)]
fn main() {
    // Release builds pass MODFS_VERSION explicitly; local builds describe the
    // git checkout instead.
    if let Ok(version) = std::env::var("MODFS_VERSION") {
        println!("cargo:rustc-env=MODFS_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=MODFS_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=MODFS_VERSION");
}
