//! Build script: embeds the device config and wires the esp-hal linker script.
//!
//! The config path comes from `THERMO_CONFIG` (optionally set in a `.env`
//! file); it defaults to `config.json` at the workspace root.

use std::env;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let workspace_root = manifest_dir.join("../..");

    // A missing .env is fine, the default path is used.
    let _ = dotenvy::from_path(workspace_root.join(".env"));

    let config_path = match env::var("THERMO_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            if path.is_absolute() { path } else { workspace_root.join(path) }
        }
        Err(_) => workspace_root.join("config.json"),
    };

    let config_path = config_path.canonicalize().unwrap_or_else(|e| {
        panic!("Device config not found at {}: {e}", config_path.display())
    });

    println!("cargo:rustc-env=THERMO_CONFIG_PATH={}", config_path.display());
    println!("cargo:rerun-if-changed={}", config_path.display());
    println!("cargo:rerun-if-env-changed=THERMO_CONFIG");
    println!("cargo:rerun-if-changed=build.rs");

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
