//! Command-line driver for tsq.
//!
//! Usage:
//!   tsq build [--project DIR] [--config FILE] [--out-dir DIR] [--workers N] [--json]
//!   tsq transform `<file>`                       - Print the rewritten source
//!   tsq quote `<file>` --class C --method M [--span func|body] [NAMES...]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;

use tsq_core::driver::config::QuoteConfig;
use tsq_core::driver::pipeline::run_build;
use tsq_core::logging::{init_logging, LogFormat, LogLevel};
use tsq_core::transform::parser::parse_file;
use tsq_core::transform::pass::{extract_named_class, transform, validate_options, PassOptions};
use tsq_core::{QuoteError, QuoteResult, SpanKind};

fn cli() -> Command {
    Command::new("tsq")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Quote decorated TypeScript methods into source-text templates")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("error, warn, info, debug or trace")
                .default_value("warn"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .help("text or json")
                .default_value("text"),
        )
        .subcommand(
            Command::new("build")
                .about("Transform every configured source into the output directory")
                .arg(
                    Arg::new("project")
                        .long("project")
                        .short('p')
                        .help("Project directory")
                        .default_value("."),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .help("Explicit tsq.json to use instead of discovery"),
                )
                .arg(Arg::new("out-dir").long("out-dir").help("Output directory"))
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .short('j')
                        .value_parser(clap::value_parser!(usize))
                        .help("Worker threads"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the build report as JSON"),
                ),
        )
        .subcommand(
            Command::new("transform")
                .about("Print the rewritten source of one file")
                .arg(Arg::new("path").required(true).index(1))
                .arg(
                    Arg::new("marker")
                        .long("marker")
                        .default_value(tsq_core::models::DEFAULT_MARKER),
                ),
        )
        .subcommand(
            Command::new("quote")
                .about("Print the quoted text of one method")
                .arg(Arg::new("path").required(true).index(1))
                .arg(Arg::new("class").long("class").required(true))
                .arg(Arg::new("method").long("method").required(true))
                .arg(
                    Arg::new("span")
                        .long("span")
                        .help("func or body")
                        .default_value("func"),
                )
                .arg(
                    Arg::new("names")
                        .index(2)
                        .num_args(0..)
                        .help("Replacement parameter names, in declaration order"),
                ),
        )
}

fn string_arg<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a str> {
    matches.get_one::<String>(id).map(String::as_str)
}

fn handle_build(matches: &ArgMatches) -> QuoteResult<()> {
    let project = PathBuf::from(string_arg(matches, "project").unwrap_or("."));
    let project = project.canonicalize().map_err(|e| {
        QuoteError::Config(format!("project directory {}: {e}", project.display()))
    })?;

    let mut config = match string_arg(matches, "config") {
        Some(path) => {
            let mut config = QuoteConfig::load(Path::new(path))?;
            config.apply_env()?;
            config
        }
        None => QuoteConfig::discover(&project)?,
    };
    if let Some(out_dir) = string_arg(matches, "out-dir") {
        config.out_dir = PathBuf::from(out_dir);
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.workers = *workers;
    }
    debug!(?config, "resolved configuration");

    let report = run_build(&project, &config)?;
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} file(s): {} transformed, {} copied, {} unchanged; {} class(es), {} method(s) quoted in {} ms",
            report.files_seen,
            report.files_transformed,
            report.files_copied,
            report.files_unchanged,
            report.classes_quoted,
            report.methods_quoted,
            report.elapsed_ms
        );
    }
    Ok(())
}

fn handle_transform(matches: &ArgMatches) -> QuoteResult<()> {
    let path = string_arg(matches, "path").unwrap_or_default();
    let options = PassOptions {
        marker: string_arg(matches, "marker")
            .unwrap_or(tsq_core::models::DEFAULT_MARKER)
            .to_string(),
        ..PassOptions::default()
    };
    validate_options(&options)?;
    let unit = parse_file(Path::new(path))?;
    let output = transform(&unit, &options)?;
    print!("{}", output.source);
    Ok(())
}

fn handle_quote(matches: &ArgMatches) -> QuoteResult<()> {
    let path = string_arg(matches, "path").unwrap_or_default();
    let class = string_arg(matches, "class").unwrap_or_default();
    let method = string_arg(matches, "method").unwrap_or_default();
    let span: SpanKind = string_arg(matches, "span").unwrap_or("func").parse()?;

    let unit = parse_file(Path::new(path))?;
    let repository = extract_named_class(&unit, class)?
        .ok_or_else(|| QuoteError::Build(format!("no class `{class}` in {path}")))?;
    let quotation = repository
        .get(method)
        .ok_or_else(|| QuoteError::Build(format!("no ordinary method `{method}` on `{class}`")))?;
    let template = quotation.template(span);

    let names: Vec<&str> = matches
        .get_many::<String>("names")
        .map(|values| values.map(String::as_str).collect())
        .unwrap_or_default();
    let text = if names.is_empty() {
        template.render_original()
    } else {
        template.render_str(&names)?
    };
    println!("{text}");
    Ok(())
}

fn run(matches: &ArgMatches) -> QuoteResult<()> {
    match matches.subcommand() {
        Some(("build", sub)) => handle_build(sub),
        Some(("transform", sub)) => handle_transform(sub),
        Some(("quote", sub)) => handle_quote(sub),
        _ => Ok(()),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let level = string_arg(&matches, "log-level")
        .and_then(LogLevel::parse)
        .unwrap_or(LogLevel::Warn);
    let format = string_arg(&matches, "log-format")
        .and_then(LogFormat::parse)
        .unwrap_or(LogFormat::Text);
    init_logging(level, format);

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tsq: {err}");
            ExitCode::FAILURE
        }
    }
}
