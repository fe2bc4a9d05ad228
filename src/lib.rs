//! Offline-first vocabulary flashcards stored in a Google Sheets spreadsheet.
//!
//! The sheet is the system of record; a local SQLite cache serves reads and
//! absorbs writes while offline, and a durable queue replays those writes in
//! order once the sheet is reachable again.

pub mod app;
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod sheet;
pub mod sync;
