//! End-to-end editing sessions against real files on disk.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{
    Arc,
    Condvar,
    Mutex,
};
use std::time::Duration;

use bilingual_catalog_editor::config::EditorSettings;
use bilingual_catalog_editor::session::{
    CatalogFiles,
    EditSession,
    EntryRequest,
    Notice,
};
use bilingual_catalog_editor::translate::{
    LanguagePair,
    TranslateError,
    Translator,
};
use bilingual_catalog_editor::types::KeyPath;
use pretty_assertions::assert_eq;
use serde_json::{
    Value,
    json,
};
use tempfile::TempDir;

/// Fake translation service with a fixed vocabulary.
struct Vocabulary;

impl Translator for Vocabulary {
    fn translate(&self, text: &str, languages: &LanguagePair) -> Result<String, TranslateError> {
        assert_eq!(languages, &LanguagePair::new("PL", "EN-GB"));
        match text {
            "jabłko" => Ok("apple".to_string()),
            "gruszka" => Ok("pear".to_string()),
            "pusty" => Ok(String::new()),
            _ => Err(TranslateError::Status { status: 456, body: "Quota exceeded".to_string() }),
        }
    }
}

/// [`Vocabulary`] that holds every call until the test releases its text.
#[derive(Default)]
struct Gated {
    released: Mutex<HashSet<String>>,
    opened: Condvar,
}

impl Gated {
    fn release(&self, text: &str) {
        self.released.lock().unwrap().insert(text.to_string());
        self.opened.notify_all();
    }
}

impl Translator for Gated {
    fn translate(&self, text: &str, languages: &LanguagePair) -> Result<String, TranslateError> {
        let released = self.released.lock().unwrap();
        drop(self.opened.wait_while(released, |released| !released.contains(text)).unwrap());
        Vocabulary.translate(text, languages)
    }
}

fn open_with(dir: &TempDir, source: &Value, target: &Value, translator: Arc<dyn Translator>) -> EditSession {
    let files = CatalogFiles::new(dir.path().join("pl.json"), dir.path().join("en.json"));
    fs::write(&files.source, source.to_string()).unwrap();
    fs::write(&files.target, target.to_string()).unwrap();
    EditSession::open(files, &EditorSettings::default(), translator)
}

fn open(dir: &TempDir, source: &Value, target: &Value) -> EditSession {
    open_with(dir, source, target, Arc::new(Vocabulary))
}

/// Polls until no more than `remaining` translations are in flight.
async fn settle_until(session: &mut EditSession, remaining: usize) -> Vec<Notice> {
    let mut notices = Vec::new();
    while session.pending_translations() > remaining {
        notices.extend(session.poll_notices());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    notices
}

/// Waits for every outstanding translation.
async fn collect_notices(session: &mut EditSession) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Some(notice) = session.next_notice().await {
        notices.push(notice);
    }
    notices
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn key(text: &str) -> KeyPath {
    KeyPath::parse(text).unwrap()
}

#[test]
fn add_with_manual_translation() {
    let dir = TempDir::new().unwrap();
    let mut session = open(&dir, &json!({}), &json!({}));

    session.add(&EntryRequest::manual("fruit.apple", "jabłko", "apple")).unwrap();
    session.save().unwrap();

    assert_eq!(read_json(&session.files().source), json!({"fruit": {"apple": "jabłko"}}));
    assert_eq!(read_json(&session.files().target), json!({"fruit": {"apple": "apple"}}));
}

#[tokio::test]
async fn add_with_auto_translation_then_undo() {
    let dir = TempDir::new().unwrap();
    let mut session = open(&dir, &json!({}), &json!({}));

    session.add(&EntryRequest::auto("fruit.apple", "jabłko")).unwrap();
    let notice = session.next_notice().await;

    assert_eq!(notice, Some(Notice::Translated { path: key("fruit.apple"), text: "apple".to_string() }));
    assert_eq!(session.catalog().target().get(&key("fruit.apple")), "apple");

    session.undo().unwrap();
    assert_eq!(session.catalog().source().to_json(), json!({}));
    assert_eq!(session.catalog().target().to_json(), json!({}));
}

#[test]
fn delete_last_child_removes_branch() {
    let dir = TempDir::new().unwrap();
    let mut session =
        open(&dir, &json!({"fruit": {"apple": "jabłko"}}), &json!({"fruit": {"apple": "apple"}}));

    session.delete("fruit.apple").unwrap();

    assert!(!session.catalog().is_branch(&key("fruit")));
    assert!(!session.catalog().key_exists(&key("fruit.apple")));
    assert_eq!(session.catalog().source().to_json(), json!({}));
    assert_eq!(session.catalog().target().to_json(), json!({}));
}

#[test]
fn edit_relocates_and_undo_restores() {
    let dir = TempDir::new().unwrap();
    let mut session =
        open(&dir, &json!({"fruit": {"apple": "jabłko"}}), &json!({"fruit": {"apple": "apple"}}));

    session.edit("fruit.apple", &EntryRequest::manual("produce.apple", "gruszka", "pear")).unwrap();
    assert_eq!(session.catalog().source().to_json(), json!({"produce": {"apple": "gruszka"}}));

    session.undo().unwrap();
    assert_eq!(session.catalog().source().get(&key("fruit.apple")), "jabłko");
    assert_eq!(session.catalog().source().leaf(&key("produce.apple")), None);
    assert_eq!(session.catalog().target().to_json(), json!({"fruit": {"apple": "apple"}}));
}

#[test]
fn undo_all_and_redo_all_are_exact() {
    let dir = TempDir::new().unwrap();
    let initial_source = json!({"menu": {"open": "Otwórz", "save": "Zapisz"}, "title": "Edytor"});
    let initial_target = json!({"menu": {"open": "Open"}, "stale": "Old"});
    let mut session = open(&dir, &initial_source, &initial_target);
    let before = session.catalog().clone();

    session.add(&EntryRequest::manual("menu.close", "Zamknij", "Close")).unwrap();
    session.edit("menu.save", &EntryRequest::manual("menu.file.save", "Zapisz plik", "Save file")).unwrap();
    session.delete("title").unwrap();
    session.edit("menu.open", &EntryRequest::manual("menu.open", "Otwórz…", "Open…")).unwrap();
    session.delete("stale").unwrap();
    let after = session.catalog().clone();

    while session.undo().is_ok() {}
    assert_eq!(session.catalog(), &before);

    while session.redo().is_ok() {}
    assert_eq!(session.catalog(), &after);
}

#[test]
fn new_command_after_undo_discards_redo() {
    let dir = TempDir::new().unwrap();
    let mut session = open(&dir, &json!({}), &json!({}));

    session.add(&EntryRequest::manual("a", "1", "one")).unwrap();
    session.undo().unwrap();
    session.add(&EntryRequest::manual("b", "2", "two")).unwrap();

    assert!(!session.history().can_redo());
    assert!(session.redo().is_err());
    assert!(!session.catalog().key_exists(&key("a")));
}

#[tokio::test]
async fn failed_and_empty_translations_stay_untranslated() {
    let dir = TempDir::new().unwrap();
    let mut session = open(&dir, &json!({}), &json!({}));

    session.add(&EntryRequest::auto("fruit.plum", "śliwka")).unwrap();
    session.add(&EntryRequest::auto("fruit.none", "pusty")).unwrap();

    let mut failed = Vec::new();
    while let Some(notice) = session.next_notice().await {
        match notice {
            Notice::TranslationFailed { path, reason } => failed.push((path.to_string(), reason)),
            other => panic!("unexpected notice {other:?}"),
        }
    }
    failed.sort();

    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].0, "fruit.none");
    assert!(failed[1].1.contains("Quota exceeded"));
    assert_eq!(session.catalog().target().to_json(), json!({}));
    assert_eq!(session.catalog().missing_translations().len(), 2);
}

#[test]
fn shutdown_waits_for_translations() {
    let dir = TempDir::new().unwrap();

    let notices = tokio_test::block_on(async {
        let mut session = open(&dir, &json!({}), &json!({}));
        session.add(&EntryRequest::auto("fruit.apple", "jabłko")).unwrap();
        session.add(&EntryRequest::auto("fruit.pear", "gruszka")).unwrap();
        session.shutdown().await
    });

    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| matches!(n, Notice::Translated { .. })));
}

#[test]
fn broken_files_open_empty() {
    let dir = TempDir::new().unwrap();
    let files = CatalogFiles::new(dir.path().join("missing.json"), dir.path().join("en.json"));
    fs::write(&files.target, "{ not json").unwrap();

    let session = EditSession::open(files, &EditorSettings::default(), Arc::new(Vocabulary));

    assert_eq!(session.catalog().count_leaves(), 0);
    assert!(session.catalog().target().is_empty());
}

#[test]
fn flatten_dotted_keys_and_save() {
    let dir = TempDir::new().unwrap();
    let mut session = open(
        &dir,
        &json!({"menu.file.open": "Otwórz", "menu": {"file.save": "Zapisz"}}),
        &json!({"menu.file.open": "Open"}),
    );

    session.flatten_dotted();
    let once = session.catalog().clone();
    session.flatten_dotted();
    assert_eq!(session.catalog(), &once);

    session.save().unwrap();
    assert_eq!(
        read_json(&session.files().source),
        json!({"menu": {"file": {"open": "Otwórz", "save": "Zapisz"}}})
    );
    assert_eq!(read_json(&session.files().target), json!({"menu": {"file": {"open": "Open"}}}));
}

#[tokio::test]
async fn edit_while_translation_pending_keeps_results_apart() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Gated::default());
    let mut session = open_with(&dir, &json!({}), &json!({}), Arc::clone(&gate) as Arc<dyn Translator>);

    session.add(&EntryRequest::auto("fruit.apple", "jabłko")).unwrap();
    session.edit("fruit.apple", &EntryRequest::auto("produce.pear", "gruszka")).unwrap();

    // The result for the moved-away key lands first and has nowhere to go.
    gate.release("jabłko");
    let mut notices = settle_until(&mut session, 1).await;
    gate.release("gruszka");
    notices.extend(collect_notices(&mut session).await);

    assert_eq!(notices, vec![Notice::Translated { path: key("produce.pear"), text: "pear".to_string() }]);
    assert_eq!(session.catalog().target().to_json(), json!({"produce": {"pear": "pear"}}));

    session.undo().unwrap();
    assert_eq!(session.catalog().source().to_json(), json!({"fruit": {"apple": "jabłko"}}));
    assert_eq!(session.catalog().target().to_json(), json!({}));
    session.redo().unwrap();
    assert_eq!(session.catalog().target().get(&key("produce.pear")), "pear");
    assert_eq!(session.catalog().target().leaf(&key("fruit.apple")), None);
}

#[tokio::test]
async fn stale_translation_never_overwrites_manual_entry() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Gated::default());
    let mut session = open_with(&dir, &json!({}), &json!({}), Arc::clone(&gate) as Arc<dyn Translator>);

    session.add(&EntryRequest::auto("fruit.apple", "jabłko")).unwrap();
    session.delete("fruit.apple").unwrap();
    session.add(&EntryRequest::manual("fruit.apple", "jabłko", "my manual")).unwrap();
    let after = session.catalog().clone();

    gate.release("jabłko");
    let notices = collect_notices(&mut session).await;

    assert!(notices.is_empty(), "unexpected notices {notices:?}");
    assert_eq!(session.catalog().target().get(&key("fruit.apple")), "my manual");

    session.undo().unwrap();
    session.redo().unwrap();
    assert_eq!(session.catalog(), &after);

    while session.undo().is_ok() {}
    assert_eq!(session.catalog().source().to_json(), json!({}));
    while session.redo().is_ok() {}
    assert_eq!(session.catalog(), &after);
}

#[tokio::test]
async fn translation_reaches_command_below_unrelated_ones() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Gated::default());
    let mut session = open_with(&dir, &json!({}), &json!({}), Arc::clone(&gate) as Arc<dyn Translator>);

    session.add(&EntryRequest::auto("fruit.apple", "jabłko")).unwrap();
    session.add(&EntryRequest::manual("fruit.pear", "gruszka", "pear")).unwrap();
    session.edit("fruit.pear", &EntryRequest::manual("fruit.plum", "śliwka", "plum")).unwrap();

    gate.release("jabłko");
    let notices = collect_notices(&mut session).await;

    assert_eq!(notices, vec![Notice::Translated { path: key("fruit.apple"), text: "apple".to_string() }]);
    let after = session.catalog().clone();
    assert_eq!(after.target().to_json(), json!({"fruit": {"apple": "apple", "plum": "plum"}}));

    while session.undo().is_ok() {}
    assert_eq!(session.catalog().target().to_json(), json!({}));
    while session.redo().is_ok() {}
    assert_eq!(session.catalog(), &after);
}

#[tokio::test]
async fn translation_for_undone_add_returns_with_redo() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Gated::default());
    let mut session = open_with(&dir, &json!({}), &json!({}), Arc::clone(&gate) as Arc<dyn Translator>);

    session.add(&EntryRequest::auto("fruit.apple", "jabłko")).unwrap();
    session.add(&EntryRequest::manual("fruit.pear", "gruszka", "pear")).unwrap();
    session.undo().unwrap();
    session.undo().unwrap();

    gate.release("jabłko");
    let notices = collect_notices(&mut session).await;

    assert_eq!(
        notices,
        vec![Notice::TranslationShelved { path: key("fruit.apple"), text: "apple".to_string() }]
    );
    assert_eq!(session.catalog().target().to_json(), json!({}));

    session.redo().unwrap();
    session.redo().unwrap();
    assert_eq!(session.catalog().target().to_json(), json!({"fruit": {"apple": "apple", "pear": "pear"}}));
}
