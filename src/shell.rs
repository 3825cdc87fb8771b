//! Line-oriented front end for an [`EditSession`].
//!
//! [`ShellCommand::parse`] turns one input line into a command without touching
//! any state; [`Shell::execute`] runs it and returns the lines to print.

use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

use crate::catalog::{
    RowKind,
    TreeRow,
};
use crate::history::Command;
use crate::session::{
    CatalogFiles,
    EditSession,
    EntryRequest,
    Notice,
    TargetText,
};
use crate::storage::RecentFiles;
use crate::types::KeyPath;

/// Separates the source text from a manual target text in `add` and `edit`.
const TARGET_SEPARATOR: char = '|';

pub const HELP: &str = "\
Commands:
  tree [query]                          show entries, optionally filtered
  add <key> <pl text> [| <en text>]     add an entry; without '|' the English text is translated
  edit <old key> <new key> <pl text> [| <en text>]
                                        change or move an entry
  delete <key>                          remove an entry
  undo | redo                           step through the edit history
  stats                                 translation progress
  missing                               entries without English text
  orphans                               English entries without Polish text
  flatten                               nest keys written with dots (clears history)
  save                                  write both files
  reload                                reread both files (clears history)
  open <pl path> <en path>              switch to another pair of files
  help                                  this text
  quit                                  leave after pending translations finish";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command '{0}'. Type 'help' for a list of commands")]
    UnknownCommand(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument { command: &'static str, argument: &'static str },
    #[error("'{0}' takes no arguments")]
    UnexpectedArgument(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Tree { query: Option<String> },
    Add(EntryRequest),
    Edit { old_key: String, request: EntryRequest },
    Delete { key: String },
    Undo,
    Redo,
    Stats,
    Missing,
    Orphans,
    Flatten,
    Save,
    Reload,
    Open(CatalogFiles),
    Help,
    Quit,
}

impl ShellCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    /// Unknown command words and missing or unexpected arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = split_word(line);

        let command = match word.to_lowercase().as_str() {
            "tree" | "ls" => Self::Tree { query: (!rest.is_empty()).then(|| rest.to_string()) },
            "add" => {
                let (key, text) = split_word(rest);
                require("add", "a key", key)?;
                Self::Add(entry_request(key, text, "add")?)
            }
            "edit" => {
                let (old_key, rest) = split_word(rest);
                let (new_key, text) = split_word(rest);
                require("edit", "the current key", old_key)?;
                require("edit", "the new key", new_key)?;
                Self::Edit { old_key: old_key.to_string(), request: entry_request(new_key, text, "edit")? }
            }
            "delete" | "rm" => {
                require("delete", "a key", rest)?;
                Self::Delete { key: rest.to_string() }
            }
            "open" => {
                let (source, target) = split_word(rest);
                require("open", "the Polish file path", source)?;
                require("open", "the English file path", target)?;
                Self::Open(CatalogFiles::new(source, target))
            }
            "undo" => bare(Self::Undo, "undo", rest)?,
            "redo" => bare(Self::Redo, "redo", rest)?,
            "stats" => bare(Self::Stats, "stats", rest)?,
            "missing" => bare(Self::Missing, "missing", rest)?,
            "orphans" => bare(Self::Orphans, "orphans", rest)?,
            "flatten" => bare(Self::Flatten, "flatten", rest)?,
            "save" => bare(Self::Save, "save", rest)?,
            "reload" => bare(Self::Reload, "reload", rest)?,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return Err(ParseError::UnknownCommand(word.to_string())),
        };
        Ok(Some(command))
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    text.split_once(char::is_whitespace)
        .map_or((text, ""), |(word, rest)| (word, rest.trim()))
}

const fn require(
    command: &'static str,
    argument: &'static str,
    value: &str,
) -> Result<(), ParseError> {
    if value.is_empty() { Err(ParseError::MissingArgument { command, argument }) } else { Ok(()) }
}

fn bare(command: ShellCommand, name: &'static str, rest: &str) -> Result<ShellCommand, ParseError> {
    if rest.is_empty() { Ok(command) } else { Err(ParseError::UnexpectedArgument(name)) }
}

fn entry_request(key: &str, text: &str, command: &'static str) -> Result<EntryRequest, ParseError> {
    let (source, target) = match text.split_once(TARGET_SEPARATOR) {
        Some((source, target)) => (source.trim(), TargetText::Manual(target.trim().to_string())),
        None => (text.trim(), TargetText::Auto),
    };
    require(command, "the Polish text", source)?;
    Ok(EntryRequest { key: key.to_string(), source: source.to_string(), target })
}

/// Tree rows as indented text, with the Polish and English text under each leaf.
#[must_use]
pub fn render_tree(rows: &[TreeRow]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() * 3);
    for row in rows {
        let indent = "  ".repeat(row.depth);
        lines.push(format!("{indent}{}", row.path.name()));
        if let RowKind::Leaf { source, target } = &row.kind {
            let target = target.as_deref().filter(|t| !t.is_empty()).unwrap_or("(no translation)");
            lines.push(format!("{indent}  [PL] {source}"));
            lines.push(format!("{indent}  [EN] {target}"));
        }
    }
    lines
}

#[must_use]
pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Translated { path, text } => format!("Translated {path}: {text}"),
        Notice::TranslationFailed { path, reason } => {
            format!("Translation failed for {path} ({reason}); left untranslated")
        }
        Notice::TranslationShelved { path, text } => {
            format!("Translated {path}: {text} (entry is undone; restored on redo)")
        }
    }
}

fn describe(command: &Command) -> String {
    match command {
        Command::Add { path, .. } => format!("add of {path}"),
        Command::Edit { old_path, new_path, .. } if old_path != new_path => {
            format!("edit of {old_path} (moved to {new_path})")
        }
        Command::Edit { new_path, .. } => format!("edit of {new_path}"),
        Command::Delete { path, .. } => format!("delete of {path}"),
    }
}

/// What [`Shell::execute`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Self { lines: vec![text.into()], quit: false }
    }
}

/// A session plus where to remember the files it opens.
#[derive(Debug)]
pub struct Shell {
    session: EditSession,
    recent_files: Option<PathBuf>,
}

impl Shell {
    #[must_use]
    pub const fn new(session: EditSession, recent_files: Option<PathBuf>) -> Self {
        Self { session, recent_files }
    }

    #[must_use]
    pub const fn session(&self) -> &EditSession {
        &self.session
    }

    /// Records the session's files in the recent files cache.
    pub fn remember_files(&self) {
        if let Some(location) = &self.recent_files {
            remember(location, self.session.files());
        }
    }

    pub async fn execute(&mut self, command: ShellCommand) -> Reply {
        let mut reply = match command {
            ShellCommand::Tree { query } => {
                let rows = self.session.tree(query.as_deref());
                if rows.is_empty() {
                    Reply::line("(no entries)")
                } else {
                    Reply { lines: render_tree(&rows), quit: false }
                }
            }
            ShellCommand::Add(request) => match self.session.add(&request) {
                Ok(_) if request.target == TargetText::Auto => {
                    Reply::line(format!("Added {}; translating...", request.key.trim()))
                }
                Ok(_) => Reply::line(format!("Added {}", request.key.trim())),
                Err(e) => Reply::line(format!("Error: {e}")),
            },
            ShellCommand::Edit { old_key, request } => match self.session.edit(&old_key, &request) {
                Ok(command) => Reply::line(format!("Done: {}", describe(&command))),
                Err(e) => Reply::line(format!("Error: {e}")),
            },
            ShellCommand::Delete { key } => match self.session.delete(&key) {
                Ok(command) => Reply::line(format!("Deleted {}", command.path())),
                Err(e) => Reply::line(format!("Error: {e}")),
            },
            ShellCommand::Undo => match self.session.undo() {
                Ok(command) => Reply::line(format!("Undid {}", describe(&command))),
                Err(e) => Reply::line(e.to_string()),
            },
            ShellCommand::Redo => match self.session.redo() {
                Ok(command) => Reply::line(format!("Redid {}", describe(&command))),
                Err(e) => Reply::line(e.to_string()),
            },
            ShellCommand::Stats => {
                let progress = self.session.progress();
                Reply::line(format!(
                    "{} of {} entries translated, {} translation(s) pending",
                    progress.translated,
                    progress.total,
                    self.session.pending_translations()
                ))
            }
            ShellCommand::Missing => {
                list_paths(&self.session.catalog().missing_translations(), "No missing translations")
            }
            ShellCommand::Orphans => {
                list_paths(&self.session.catalog().orphaned_translations(), "No orphaned translations")
            }
            ShellCommand::Flatten => {
                self.session.flatten_dotted();
                Reply::line("Dotted keys nested; history cleared")
            }
            ShellCommand::Save => match self.session.save() {
                Ok(report) => {
                    let mut reply = Reply::line(format!(
                        "Saved {} entries to {} and {}",
                        report.entries,
                        report.files.source.display(),
                        report.files.target.display()
                    ));
                    if report.pending > 0 {
                        reply.lines.push(format!(
                            "{} translation(s) still pending; save again once they land",
                            report.pending
                        ));
                    }
                    reply
                }
                Err(e) => Reply::line(format!("Save failed: {e}")),
            },
            ShellCommand::Reload => {
                let mut lines = self.settled("Waiting for pending translations...");
                lines.extend(render_notices(&self.session.reload().await));
                lines.push(format!("Reloaded {} entries", self.session.catalog().count_leaves()));
                Reply { lines, quit: false }
            }
            ShellCommand::Open(files) => {
                let mut lines = self.settled("Waiting for pending translations...");
                lines.extend(render_notices(&self.session.change_files(files).await));
                self.remember_files();
                lines.push(format!(
                    "Opened {} and {} ({} entries)",
                    self.session.files().source.display(),
                    self.session.files().target.display(),
                    self.session.catalog().count_leaves()
                ));
                Reply { lines, quit: false }
            }
            ShellCommand::Help => Reply::line(HELP),
            ShellCommand::Quit => Reply { lines: Vec::new(), quit: true },
        };

        // Translations that finished meanwhile are shown after the reply.
        reply.lines.extend(self.poll_notices());
        reply
    }

    /// Applies finished translations and renders them.
    pub fn poll_notices(&mut self) -> Vec<String> {
        render_notices(&self.session.poll_notices())
    }

    /// Waits for the next translation. `None` once nothing is pending.
    pub async fn next_notice(&mut self) -> Option<String> {
        self.session.next_notice().await.map(|notice| render_notice(&notice))
    }

    /// Waits for pending translations and closes the session.
    pub async fn shutdown(self) -> Vec<String> {
        render_notices(&self.session.shutdown().await)
    }

    fn settled(&self, waiting: &str) -> Vec<String> {
        if self.session.pending_translations() > 0 { vec![waiting.to_string()] } else { Vec::new() }
    }
}

fn render_notices(notices: &[Notice]) -> Vec<String> {
    notices.iter().map(render_notice).collect()
}

fn list_paths(paths: &[KeyPath], empty: &str) -> Reply {
    if paths.is_empty() {
        return Reply::line(empty);
    }
    Reply { lines: paths.iter().map(ToString::to_string).collect(), quit: false }
}

fn remember(location: &Path, files: &CatalogFiles) {
    let absolute = |path: &Path| std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    RecentFiles::new(absolute(&files.source), absolute(&files.target)).store(location);
}
