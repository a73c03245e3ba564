//! tokenmeter CLI binary: how much of the selected models' input window a draft uses.
//!
//! Subcommands: `report` (one draft, one report) and `watch` (drafts from stdin, one report per
//! published change).

mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cli::{run_report, watch::run_watch, CliError, OutputFormat, SessionOptions};
use tokenmeter::{config::APP_NAME, CapacityReport, TrackerConfig};

/// Exit status when `--fail-on-exceeded` is set and the input does not fit.
const EXIT_EXCEEDED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "tokenmeter")]
#[command(about = "tokenmeter: track how much of each selected model's input limit a draft uses")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Verbose: debug logs from the tracker and estimation client on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print reports as JSON (one object per line)
    #[arg(long, global = true)]
    json: bool,

    /// When using --json, pretty-print (multi-line)
    #[arg(long, global = true)]
    pretty: bool,

    /// Exit with status 2 when the (final) report exceeds the input limit
    #[arg(long, global = true)]
    fail_on_exceeded: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one report for a draft
    Report {
        #[command(flatten)]
        session: SessionArgs,

        /// Draft text
        #[arg(short, long, value_name = "TEXT", conflicts_with = "text_file")]
        text: Option<String>,

        /// Read the draft from this file
        #[arg(long, value_name = "PATH")]
        text_file: Option<PathBuf>,
    },
    /// Read drafts line by line from stdin and print a report whenever it changes
    Watch {
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(clap::Args, Debug)]
struct SessionArgs {
    /// Selected model id; repeat to compare models (first one picks the tokenizer)
    #[arg(short = 'm', long = "model", value_name = "ID")]
    models: Vec<String>,

    /// File to attach to the draft; repeatable
    #[arg(long = "attach", value_name = "PATH")]
    attachments: Vec<PathBuf>,

    /// JSON file with per-model conversation threads
    #[arg(long, value_name = "PATH")]
    conversations: Option<PathBuf>,

    /// Count conversation history (follow-up message)
    #[arg(long)]
    follow_up: bool,

    /// Local model catalog JSON (default: config catalog_path, else catalog_url)
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Tokenizer endpoint (default: config tokenizer_url or TOKENMETER_TOKENIZER_URL)
    #[arg(long, value_name = "URL")]
    tokenizer_url: Option<String>,

    /// Do not call the tokenizer; use the character-based estimate only
    #[arg(long)]
    offline: bool,
}

impl From<SessionArgs> for SessionOptions {
    fn from(a: SessionArgs) -> Self {
        Self {
            models: a.models,
            attachments: a.attachments,
            conversations: a.conversations,
            follow_up: a.follow_up,
            catalog: a.catalog,
            tokenizer_url: a.tokenizer_url,
            offline: a.offline,
        }
    }
}

fn read_draft(text: Option<String>, text_file: Option<PathBuf>) -> Result<String, CliError> {
    match (text, text_file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => {
            std::fs::read_to_string(&path).map_err(|source| CliError::Read { path, source })
        }
        (None, None) => Ok(String::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match TrackerConfig::load(APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tokenmeter: ignoring config: {e}");
            TrackerConfig::default()
        }
    };
    let args = Args::parse();
    logging::init(args.verbose)?;

    let format = OutputFormat::from_flags(args.json, args.pretty);
    let thresholds = config.thresholds();
    let report: CapacityReport = match args.cmd {
        Command::Report {
            session,
            text,
            text_file,
        } => {
            let draft = read_draft(text, text_file)?;
            let report = run_report(&session.into(), &config, &draft).await?;
            println!("{}", cli::render(&report, &thresholds, format)?);
            report
        }
        Command::Watch { session } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            run_watch(&session.into(), &config, stdin, &mut stdout, format).await?
        }
    };

    if args.fail_on_exceeded && report.blocks_submission() {
        std::process::exit(EXIT_EXCEEDED);
    }
    Ok(())
}
