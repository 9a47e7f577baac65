//! s3relay - S3 object-storage actions from the command line
//!
//! Runs one named action (signed upload/download URL, put, list, copy,
//! delete) with a JSON option bag and prints the JSON result on stdout.

mod config;

use clap::Parser;
use s3relay_core::{ActionError, OptionBag};
use s3relay_s3::{Action, CallContext, Dispatcher};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "s3relay")]
#[command(about = "Run S3 object-storage actions", long_about = None)]
struct Args {
    /// Action to run: signed_upload, signed_download, put_object, list_files, copy_object, delete_file
    action: String,

    /// Options as a JSON object (read from stdin when neither this nor --options-file is given)
    #[arg(short, long, conflicts_with = "options_file")]
    options: Option<String>,

    /// File holding the options JSON object
    #[arg(long)]
    options_file: Option<PathBuf>,

    /// Uploaded file available to put_object, as NAME=PATH (repeatable)
    #[arg(long = "temp-file", value_name = "NAME=PATH", value_parser = parse_temp_file)]
    temp_files: Vec<(String, PathBuf)>,

    /// Base directory for put_object paths when useFilePath is set
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long, env = "S3RELAY_PRETTY")]
    pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "S3RELAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Settings file (defaults to ./s3relay.toml when present)
    #[arg(long, env = "S3RELAY_CONFIG")]
    config: Option<PathBuf>,
}

fn parse_temp_file(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{}'", value)),
    }
}

async fn read_options(args: &Args) -> Result<Value, ActionError> {
    let raw = if let Some(options) = &args.options {
        options.clone()
    } else if let Some(path) = &args.options_file {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ActionError::file_access(path, e))?
    } else {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|e| ActionError::validation(format!("cannot read options from stdin: {}", e)))?;
        buf
    };

    parse_options(&raw)
}

/// Blank input is an empty bag
fn parse_options(raw: &str) -> Result<Value, ActionError> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw)
        .map_err(|e| ActionError::validation(format!("options are not valid JSON: {}", e)))
}

fn call_context(args: &Args) -> Result<CallContext, ActionError> {
    let base = match &args.working_dir {
        Some(dir) => CallContext::new(dir),
        None => CallContext::from_current_dir().map_err(|e| ActionError::file_access(".", e))?,
    };
    Ok(args
        .temp_files
        .iter()
        .fold(base, |ctx, (name, path)| {
            ctx.with_temp_file(name.clone(), path.clone())
        }))
}

async fn run(args: &Args) -> Result<Value, ActionError> {
    let action = args.action.parse::<Action>()?;
    let bag = OptionBag::from_value(read_options(args).await?)?;
    let ctx = call_context(args)?;

    debug!(%action, invocation = %ctx.invocation_id, "Dispatching");
    Dispatcher::default().invoke(action, &bag, &ctx).await
}

fn render(value: &Value, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn error_document(err: &ActionError) -> Value {
    let mut doc = json!({
        "error": err.kind(),
        "message": err.to_string(),
    });
    if let ActionError::Backend(backend) = err {
        doc["code"] = json!(backend.code_str());
        if let Some(status) = backend.status_code() {
            doc["statusCode"] = json!(status);
        }
        if let Some(resource) = &backend.resource {
            doc["resource"] = json!(resource);
        }
        if let Some(request_id) = &backend.request_id {
            doc["requestId"] = json!(request_id);
        }
    }
    doc
}

fn report(err: &ActionError, pretty: bool) -> anyhow::Result<ExitCode> {
    error!(kind = err.kind(), "{}", err);
    println!("{}", render(&error_document(err), pretty)?);
    Ok(ExitCode::FAILURE)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let settings = match config::Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            let err = ActionError::validation(format!("invalid settings: {:#}", e));
            return report(&err, args.pretty);
        }
    };
    let log_level = args.log_level.as_deref().unwrap_or(&settings.log_level);
    let pretty = args.pretty || settings.pretty;

    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("s3relay={0},s3relay_s3={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args).await {
        Ok(value) => {
            println!("{}", render(&value, pretty)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report(&e, pretty),
    }
}
