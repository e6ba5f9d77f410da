//! `paperboy`: render a URL, an HTML file or HTML on standard input to PDF.
//!
//! ```text
//! paperboy https://example.com -o example.pdf
//! paperboy -O media_type=print -s print.css report.html > report.pdf
//! echo '<h1>Hi</h1>' | paperboy - -o hi.pdf
//! ```

mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser};
use exn::ResultExt;
use paperboy_config::Config;
use paperboy_render::{OptionValue, Options, Renderer, Source, StyleConfig};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "paperboy", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the user
    /// configuration and under `PAPERBOY_*` environment variables.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// WeasyPrint executable, overriding the configured one.
    #[arg(long, value_name = "PATH")]
    executable: Option<PathBuf>,

    /// WeasyPrint option, e.g. `-O media_type=print` or `-O presentational_hints`.
    /// Repeatable; overrides configured options of the same name.
    #[arg(short = 'O', long = "option", value_name = "KEY[=VALUE]", value_parser = parse_option)]
    options: Vec<(String, OptionValue)>,

    /// Stylesheet file injected into HTML sources. Repeatable.
    #[arg(short, long = "stylesheet", value_name = "FILE")]
    stylesheets: Vec<PathBuf>,

    /// Inline CSS injected into HTML sources, after any stylesheets. Repeatable.
    #[arg(long = "style", value_name = "CSS")]
    styles: Vec<String>,

    /// Write the PDF here instead of to standard output.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the WeasyPrint command line and exit without rendering.
    #[arg(long)]
    print_command: bool,

    /// More logging (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// `-` for HTML on standard input, an `http(s)` URL, or a file path.
    source: String,
}

/// `key=value`, or a bare `key` meaning "pass the flag".
fn parse_option(raw: &str) -> std::result::Result<(String, OptionValue), String> {
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key.trim(), parse_value(value)),
        None => (raw.trim(), OptionValue::Bool(true)),
    };
    if key.is_empty() {
        return Err(format!("missing option name in `{raw}`"));
    }
    Ok((key.to_string(), value))
}

fn parse_value(value: &str) -> OptionValue {
    match value {
        "true" => OptionValue::Bool(true),
        "false" => OptionValue::Bool(false),
        _ => value.parse::<i64>().map_or_else(|_| OptionValue::Text(value.to_string()), OptionValue::Integer),
    }
}

fn source(raw: &str) -> Result<Source> {
    if raw == "-" {
        let mut html = Vec::new();
        std::io::stdin().read_to_end(&mut html).or_raise(|| ErrorKind::Io)?;
        return Ok(Source::Html(html));
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Ok(Source::Url(raw.to_string()));
    }
    Ok(Source::File(PathBuf::from(raw)))
}

fn renderer(cli: &Cli, config: &Config) -> Result<Renderer> {
    let executable = cli.executable.as_ref().unwrap_or(&config.executable);
    let overrides: Options = cli.options.iter().cloned().collect();
    let options = config.renderer_options().merge(&overrides);
    let mut styles = StyleConfig::new();
    for path in &cli.stylesheets {
        styles = styles.with_file(path).or_raise(|| ErrorKind::Render)?;
    }
    for css in &cli.styles {
        styles = styles.with_content(css.clone());
    }
    let renderer = Renderer::discover(executable, options).or_raise(|| ErrorKind::Render)?;
    Ok(renderer.with_styles(styles))
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let renderer = renderer(cli, &config)?;

    if cli.print_command {
        let source = if cli.source == "-" { Source::Html(Vec::new()) } else { source(&cli.source)? };
        println!("{}", renderer.command(&source, cli.output.as_deref()));
        return Ok(());
    }

    let source = source(&cli.source)?;
    match &cli.output {
        Some(path) => {
            let pdf = renderer.to_file(source, path).or_raise(|| ErrorKind::Render)?;
            tracing::info!(path = %path.display(), bytes = pdf.len(), "Wrote PDF");
        },
        None => {
            let pdf = renderer.to_pdf(source).or_raise(|| ErrorKind::Render)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&pdf).or_raise(|| ErrorKind::Io)?;
            stdout.flush().or_raise(|| ErrorKind::Io)?;
        },
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "paperboy failed");
            eprintln!("error: {}", *err);
            ExitCode::FAILURE
        },
    }
}
