//! bilingual-catalog-editor
//!
//! Editing core for a pair of nested JSON translation catalogs (Polish source,
//! English target): the nested-key store, the paired catalog, undo/redo history
//! and background machine translation, plus a line-oriented shell on top.

pub mod catalog;
pub mod config;
pub mod history;
pub mod session;
pub mod shell;
pub mod storage;
pub mod store;
pub mod translate;
pub mod types;
