//! SQLite backend for the payment engine.

pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
