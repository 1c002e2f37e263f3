use anyhow::Context;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use rollcall_cli::{exit_code, read_marks, render_sheet, Settings};
use rollcall_core::{
    AttendanceBackend, AttendanceEngine, AttendanceError, AttendanceMark, CancellationToken,
    EnvCredentials, SessionId,
};
use rollcall_http::HttpBackend;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("rollcall")
        .version(rollcall_core::VERSION)
        .about("Attendance reconciliation for class sessions")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML file with [engine] and [http] tables"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("JSON output and JSON logs"),
        )
        .subcommand(
            Command::new("show")
                .about("Load a session sheet")
                .arg(session_arg()),
        )
        .subcommand(
            Command::new("save")
                .about("Save marks from a JSON file")
                .arg(session_arg())
                .arg(
                    Arg::new("marks")
                        .long("marks")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("JSON array of { studentId, status, note }"),
                )
                .arg(
                    Arg::new("novel")
                        .long("novel")
                        .action(ArgAction::SetTrue)
                        .help("Session has no records yet; create marks"),
                )
                .arg(
                    Arg::new("established")
                        .long("established")
                        .action(ArgAction::SetTrue)
                        .help("Session already has records; update marks"),
                )
                .group(ArgGroup::new("novelty").args(["novel", "established"])),
        )
}

fn session_arg() -> Arg {
    Arg::new("session")
        .long("session")
        .required(true)
        .help("Class session identifier")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let json = matches.get_flag("json")
        || matches
            .subcommand()
            .is_some_and(|(_, args)| args.get_flag("json"));
    init_tracing(json);

    if let Err(error) = run(&matches, json).await {
        eprintln!("error: {error:#}");
        std::process::exit(exit_code(&error));
    }
}

async fn run(matches: &ArgMatches, json: bool) -> anyhow::Result<()> {
    let config = matches
        .subcommand()
        .and_then(|(_, args)| args.get_one::<PathBuf>("config"))
        .or_else(|| matches.get_one::<PathBuf>("config"));
    let settings = Settings::load(config.map(PathBuf::as_path))?;
    let backend: Arc<dyn AttendanceBackend> = Arc::new(HttpBackend::new(&settings.http)?);
    let engine = AttendanceEngine::new(backend).with_config(settings.engine.clone());
    let credentials = EnvCredentials::default();
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling");
            interrupt.cancel();
        }
    });

    match matches.subcommand() {
        Some(("show", args)) => {
            let session_id = session_id(args)?;
            let sheet = engine.load_sheet(&session_id, &credentials, &cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sheet)?);
            } else {
                print!("{}", render_sheet(&sheet));
            }
        }
        Some(("save", args)) => {
            let session_id = session_id(args)?;
            let marks_path = args
                .get_one::<PathBuf>("marks")
                .context("--marks is required")?;
            let marks = read_marks(marks_path)?;
            if !marks.iter().any(AttendanceMark::is_dirty) {
                return Err(AttendanceError::NothingToSave.into());
            }

            let novel = if args.get_flag("novel") {
                true
            } else if args.get_flag("established") {
                false
            } else {
                engine.detect_novelty(&session_id, &credentials, &cancel).await?
            };

            let report = engine
                .save_marks(&session_id, &marks, novel, &credentials, &cancel)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("saved {} marks ({})", report.saved.len(), report.mode.as_str());
            }
        }
        _ => anyhow::bail!("no command given; see --help"),
    }
    Ok(())
}

fn session_id(args: &ArgMatches) -> anyhow::Result<SessionId> {
    args.get_one::<String>("session")
        .map(|id| SessionId::new(id.trim()))
        .filter(|id| !id.as_str().is_empty())
        .context("--session must not be blank")
}
