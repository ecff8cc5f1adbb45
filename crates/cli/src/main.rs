use std::{
    error::Error,
    fs,
    io::{stdout, Write},
    path::PathBuf,
};

use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use serde_json::Value;
use vellum::{CompiledTemplate, HelperRegistry, RenderData, Renderer};

/// Render a vellum template against a JSON data payload.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template file to render
    template: PathBuf,

    /// JSON file with a `{ "global": ..., "request": ... }` payload
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Extra request-scope values as KEY=VALUE
    #[arg(short, long, value_parser = parse_key_val)]
    set: Vec<(String, String)>,

    /// Write the rendered HTML here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level for render warnings (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
}

/// Parse a single key-value pair
fn parse_key_val(s: &str) -> Result<(String, String), Box<dyn Error + Send + Sync + 'static>> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((k.to_owned(), v.to_owned()))
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    let source = fs::read_to_string(&args.template)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read template `{}`", args.template.display()))?;

    let mut data = match &args.data {
        Some(path) => {
            let payload = fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read data file `{}`", path.display()))?;
            serde_json::from_str::<RenderData>(&payload)
                .into_diagnostic()
                .wrap_err_with(|| format!("invalid JSON payload in `{}`", path.display()))?
        }
        None => RenderData::default(),
    };

    if !args.set.is_empty() {
        if !data.request.is_object() {
            data.request = Value::Object(Default::default());
        }
        if let Value::Object(request) = &mut data.request {
            for (key, value) in args.set {
                request.insert(key, Value::String(value));
            }
        }
    }

    let template = CompiledTemplate::parse(&source)
        .map_err(|err| err.with_name(args.template.display().to_string()))
        .map_err(miette::Report::new)?;

    let html = Renderer::new(&HelperRegistry::new()).render(&template, &data);

    match &args.output {
        Some(path) => fs::write(path, html)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write `{}`", path.display()))?,
        None => stdout()
            .lock()
            .write_all(html.as_bytes())
            .into_diagnostic()?,
    }

    Ok(())
}
