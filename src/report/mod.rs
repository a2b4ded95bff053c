//! Report parsing and rendering.
//!
//! `parser` turns the backend's free-form markdown report into the
//! structured `ReportData` view model; `render` formats that model for
//! the terminal, markdown export, and JSON export.

pub mod parser;
pub mod render;

pub use parser::parse;
