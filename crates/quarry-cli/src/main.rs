mod config;
mod error;
mod request;

use std::io::Read;

use quarry_query::PipelineCompiler;

use crate::error::CliError;
use crate::request::CompileRequest;

const USAGE: &str = "usage: quarry-compile [REQUEST.json | -]";

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let arg = std::env::args().nth(1);
    if matches!(arg.as_deref(), Some("-h" | "--help")) {
        println!("{USAGE}");
        return;
    }

    if let Err(e) = run(arg.as_deref()) {
        eprintln!("quarry-compile: {e}");
        std::process::exit(1);
    }
}

fn run(path: Option<&str>) -> Result<(), CliError> {
    let config = config::load()?;
    tracing::debug!(always_projected = ?config.always_projected, "loaded compiler config");

    let input = match path {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        Some(path) => std::fs::read_to_string(path)?,
    };

    let request: CompileRequest = serde_json::from_str(&input)?;
    let pipeline = request.compile(&PipelineCompiler::new(config))?;
    tracing::info!(stages = pipeline.len(), "compiled pipeline");

    let json = request::to_json(&pipeline)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
