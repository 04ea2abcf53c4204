//! rfcli - label-based selection against a REST data store
//!
//! ```text
//! rfcli --url http://host/api --index detector --index time:interval --column gain sel tpc 5
//! rfcli ... at '["tpc", 5]' gain
//! rfcli ... set tpc '[0, 10]' gain=1.5
//! rfcli ... repl
//! ```
//!
//! Labels are JSON where they parse as JSON and strings otherwise. `..`,
//! `a..b`, `a..` and `..b` are ranges; `name=label` is a named label.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use rframe::{Document, Frame, IndexDescriptor, Label, Labels, RestConfig, TableSchema};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "rfcli", version, about = "Label-based selection over a REST data store")]
struct Cli {
    /// Base URL of the REST endpoint
    #[arg(long, env = "RFRAME_URL")]
    url: String,

    /// Bearer token
    #[arg(long, env = "RFRAME_TOKEN")]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "RFRAME_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// Entity name
    #[arg(long, default_value = "frame")]
    name: String,

    /// Index field as `name[:value|interpolating|interval]`, in order
    #[arg(long = "index", required = true)]
    index: Vec<String>,

    /// Column name
    #[arg(long = "column")]
    columns: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Op(Op),
    /// Interactive session
    Repl,
}

#[derive(Subcommand, Debug)]
enum Op {
    /// Select records
    Sel { labels: Vec<String> },
    /// Read one value at a fully qualified index
    At { index: String, column: String },
    /// Insert one record
    Set { labels: Vec<String> },
    /// First n records
    Head {
        #[arg(short, default_value_t = 10)]
        n: usize,
    },
}

/// One REPL line
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ReplLine {
    #[command(subcommand)]
    op: Op,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let frame = connect(&cli)?;
    match cli.command {
        Command::Op(op) => execute(&frame, op),
        Command::Repl => repl(&frame),
    }
}

fn connect(cli: &Cli) -> Result<Frame> {
    let mut schema = TableSchema::new(&cli.name);
    for spec in &cli.index {
        schema = schema.index(parse_index(spec)?);
    }
    for column in &cli.columns {
        schema = schema.column(column);
    }

    let mut config = RestConfig::new(&cli.url).timeout(Duration::from_secs(cli.timeout));
    if let Some(token) = &cli.token {
        config = config.token(token);
    }
    let client = config.build().with_context(|| format!("connecting to {}", cli.url))?;
    let frame = Frame::new(Arc::new(schema), rframe::Connection::Rest(Arc::new(client)))?;
    tracing::debug!(?frame, "connected");
    Ok(frame)
}

fn parse_index(spec: &str) -> Result<IndexDescriptor> {
    let (name, kind) = spec.split_once(':').unwrap_or((spec, "value"));
    Ok(match kind {
        "value" => IndexDescriptor::value(name),
        "interpolating" => IndexDescriptor::interpolating(name),
        "interval" => IndexDescriptor::interval(name),
        other => bail!("unknown index kind '{other}' for '{name}'"),
    })
}

fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn parse_label(text: &str) -> Label {
    if let Some((start, stop)) = text.split_once("..") {
        let bound = |s: &str| (!s.is_empty()).then(|| parse_value(s));
        if start.parse::<f64>().is_ok() || stop.parse::<f64>().is_ok() || text == ".." {
            return Label::Range { start: bound(start), stop: bound(stop) };
        }
    }
    Label::from_json(parse_value(text))
}

fn parse_labels(args: &[String]) -> Labels {
    args.iter().fold(Labels::new(), |labels, arg| match arg.split_once('=') {
        Some((name, label)) if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') => {
            labels.named(name, parse_label(label))
        }
        _ => labels.arg(parse_label(arg)),
    })
}

fn execute(frame: &Frame, op: Op) -> Result<()> {
    match op {
        Op::Sel { labels } => print_records(frame, &frame.sel(&parse_labels(&labels))?)?,
        Op::Head { n } => print_records(frame, &frame.head(n)?)?,
        Op::At { index, column } => {
            let value = frame.at().get(parse_label(&index), &column)?;
            println!("{}", cell(&value));
        }
        Op::Set { labels } => {
            let record = frame.set(&parse_labels(&labels))?;
            println!("{} {}", "inserted".green(), Value::Object(record));
        }
    }
    Ok(())
}

fn repl(frame: &Frame) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("{:?}", frame);
    println!("commands: sel, at, set, head, exit");
    loop {
        let line = match rl.readline("rframe> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = rl.add_history_entry(line) {
            eprintln!("{e}");
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let words = match shell_words::split(line) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("{} {e}", "error:".red());
                continue;
            }
        };
        match ReplLine::try_parse_from(words) {
            Ok(ReplLine { op }) => {
                if let Err(e) = execute(frame, op) {
                    eprintln!("{} {e:#}", "error:".red());
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn print_records(frame: &Frame, records: &[Document]) -> Result<()> {
    let header: Vec<String> = frame
        .index_names()
        .into_iter()
        .map(str::to_string)
        .chain(frame.columns().iter().cloned())
        .collect();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.clone());
    for record in records {
        table.add_row(header.iter().map(|f| record.get(f).map(cell).unwrap_or_default()));
    }
    println!("{table}");
    println!("{} records", records.len().to_string().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_label_shapes() {
        assert_eq!(parse_label("5"), Label::from(5));
        assert_eq!(parse_label("tpc"), Label::from("tpc"));
        assert_eq!(parse_label("[0, 10]"), Label::from((0, 10)));
        assert_eq!(parse_label("null"), Label::Any);
        assert_eq!(parse_label(".."), Label::Range { start: None, stop: None });
        assert_eq!(parse_label("3..7"), Label::range(3, 7));
        assert_eq!(parse_label("3.."), Label::Range { start: Some(json!(3)), stop: None });
    }

    #[test]
    fn test_parse_labels_named() {
        let labels = parse_labels(&["tpc".to_string(), "gain=1.5".to_string(), "a=b=c".to_string()]);
        assert_eq!(labels.positional(), &[Label::from("tpc")]);
        assert_eq!(labels.named_labels().get("gain"), Some(&Label::from(1.5)));
        assert_eq!(labels.named_labels().get("a"), Some(&Label::from("b=c")));
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("time:interval").unwrap(), IndexDescriptor::interval("time"));
        assert_eq!(parse_index("run").unwrap(), IndexDescriptor::value("run"));
        assert!(parse_index("x:fuzzy").is_err());
    }

    #[test]
    fn test_repl_line_parsing() {
        let line = ReplLine::try_parse_from(["at", "[1, 2]", "gain"]).unwrap();
        assert!(matches!(line.op, Op::At { ref column, .. } if column == "gain"));
        assert!(ReplLine::try_parse_from(["drop"]).is_err());
    }
}
