//! Writes the dashboard's OpenAPI document.
//!
//! Usage:
//!   cargo run --bin generate_openapi > openapi.json
//!   cargo run --bin generate_openapi -- --output openapi.json

use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use home_dashboard::api::handlers::ApiDoc;
use utoipa::OpenApi;

fn main() -> ExitCode {
    let json = match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to serialise OpenAPI document: {e}");
            return ExitCode::FAILURE;
        }
    };

    let output_path = env::args()
        .skip_while(|arg| arg != "--output")
        .nth(1)
        .map(PathBuf::from);

    let written = match &output_path {
        Some(path) => fs::write(path, &json),
        None => io::stdout().write_all(json.as_bytes()),
    };

    match (written, output_path) {
        (Ok(()), Some(path)) => {
            eprintln!("OpenAPI document written to {}", path.display());
            ExitCode::SUCCESS
        }
        (Ok(()), None) => ExitCode::SUCCESS,
        (Err(e), _) => {
            eprintln!("Failed to write OpenAPI document: {e}");
            ExitCode::FAILURE
        }
    }
}
