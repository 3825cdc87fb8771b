//! Entry point for the interactive catalog editor.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bilingual_catalog_editor::config::{
    ConfigError,
    ConfigManager,
    EditorSettings,
};
use bilingual_catalog_editor::session::{
    CatalogFiles,
    EditSession,
};
use bilingual_catalog_editor::shell::{
    Shell,
    ShellCommand,
};
use bilingual_catalog_editor::storage::RecentFiles;
use bilingual_catalog_editor::translate::{
    DeeplTranslator,
    Translator,
    Unconfigured,
};
use clap::Parser;
use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt,
    BufReader,
};
use tracing_subscriber::EnvFilter;

/// Edit a Polish/English pair of nested JSON translation files.
#[derive(Parser, Debug)]
#[command(name = "catalog-editor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Polish (source) catalog file
    #[arg(short, long, value_name = "PL_FILE", requires = "target")]
    source: Option<PathBuf>,

    /// English (target) catalog file
    #[arg(short, long, value_name = "EN_FILE", requires = "source")]
    target: Option<PathBuf>,

    /// Directory containing `.catalog-editor.json` (default: current directory)
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("No catalog files given and none remembered. Pass --source <PL_FILE> --target <EN_FILE>")]
    NoFiles,
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Exiting after error: {e:?}");
            if let Err(write_error) = writeln!(std::io::stderr(), "{e}") {
                tracing::error!("{e} (stderr unavailable: {write_error})");
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr through a background writer so they never block the shell.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(writer)
        .init();
    guard
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = ConfigManager::new();
    let config_dir = cli.config_dir.or_else(|| std::env::current_dir().ok());
    config.load_settings(config_dir.as_deref())?;
    let settings = config.get_settings();

    let recent_location =
        settings.recent_files_path.clone().or_else(RecentFiles::default_location);
    let files = match (cli.source, cli.target) {
        (Some(source), Some(target)) => CatalogFiles::new(source, target),
        _ => recent_location
            .as_deref()
            .and_then(RecentFiles::load)
            .map(|recent| CatalogFiles::new(recent.pl_file, recent.en_file))
            .ok_or(AppError::NoFiles)?,
    };

    let session = EditSession::open(files, settings, translator(settings));
    let mut shell = Shell::new(session, recent_location);
    shell.remember_files();

    let mut out = std::io::stdout();
    writeln!(
        out,
        "Editing {} and {} ({} entries). Type 'help' for commands.",
        shell.session().files().source.display(),
        shell.session().files().target.display(),
        shell.session().catalog().count_leaves()
    )?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else { break };
                match ShellCommand::parse(&line) {
                    Ok(Some(command)) => {
                        let reply = shell.execute(command).await;
                        write_lines(&mut out, &reply.lines)?;
                        if reply.quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => writeln!(out, "{e}")?,
                }
            }
            Some(notice) = shell.next_notice(), if shell.session().pending_translations() > 0 => {
                writeln!(out, "{notice}")?;
            }
        }
    }

    if shell.session().pending_translations() > 0 {
        writeln!(out, "Waiting for pending translations...")?;
    }
    let notices = shell.shutdown().await;
    write_lines(&mut out, &notices)?;
    Ok(())
}

fn translator(settings: &EditorSettings) -> Arc<dyn Translator> {
    let config = &settings.translation;
    match DeeplTranslator::from_env(&config.auth_key_env, config.api_url.as_deref()) {
        Ok(translator) => Arc::new(translator),
        Err(e) => {
            tracing::warn!("{e}; automatic translation is unavailable");
            Arc::new(Unconfigured::new(&config.auth_key_env))
        }
    }
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}
