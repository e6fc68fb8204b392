//! Build script for the Ánima API server.
//!
//! Copies the `.env.example` configuration template into the user's local data
//! directory and tells cargo to rebuild whenever the SQL migrations embedded by
//! `sqlx::migrate!` change.

use std::{env, fs, path::PathBuf};

/// Build script entry point.
///
/// # Build Process
///
/// 1. **Rebuild Triggers**: re-run when the template or any migration changes
/// 2. **Template Copy**: place `.env.example` under the local data directory
///
/// # Destination Location
///
/// - Linux: `~/.local/share/anima/.env.example`
/// - macOS: `~/Library/Application Support/anima/.env.example`
/// - Windows: `%LOCALAPPDATA%/anima/.env.example`
///
/// A missing template only produces a `cargo:warning`; directory or write
/// failures abort the build.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");
    println!("cargo:rerun-if-changed=migrations");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("anima");
    fs::create_dir_all(&out_dir)?;

    if env_example_path.is_file() {
        let contents = fs::read_to_string(&env_example_path)?;
        fs::write(out_dir.join(".env.example"), contents)?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
