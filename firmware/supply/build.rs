use std::env;
use std::path::PathBuf;
use std::process::Command;

// Injects the linker scripts and a firmware version string.
//
// Exports:
//   - BENCHFOX_FW_VERSION: "<crate> <semver> (profile <profile>, git <describe|unknown>)"

fn main() {
    // Ensure essential linker args are present even when building from the
    // repo root (so `firmware/supply/.cargo/config.toml` is not picked up).
    // When building from `firmware/supply/` these already come from
    // `.cargo/config.toml`; avoid emitting duplicates.
    let rustflags = env::var("CARGO_ENCODED_RUSTFLAGS").unwrap_or_default();
    if !rustflags.contains("link.x") {
        println!("cargo:rustc-link-arg=-Tlink.x");
    }
    if !rustflags.contains("defmt.x") {
        println!("cargo:rustc-link-arg=-Tdefmt.x");
    }
    if !rustflags.contains("--nmagic") {
        println!("cargo:rustc-link-arg=--nmagic");
    }

    println!("cargo:rerun-if-changed=src/");

    let pkg_name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "unknown".to_string());
    let pkg_ver = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let git_info = git_describe().unwrap_or_else(|| "git unknown".to_string());

    println!(
        "cargo:rustc-env=BENCHFOX_FW_VERSION={pkg_name} {pkg_ver} (profile {profile}, {git_info})"
    );
}

fn git_describe() -> Option<String> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").ok()?);
    let repo_root = manifest_dir.parent()?.parent()?.to_path_buf();

    let output = Command::new("git")
        .arg("-C")
        .arg(&repo_root)
        .args(["describe", "--tags", "--dirty", "--always"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if s.is_empty() { None } else { Some(format!("git {s}")) }
}
