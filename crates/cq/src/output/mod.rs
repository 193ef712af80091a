//! Output formatting utilities for the cq CLI.
//!
//! - [`expression`] - Parsed filter expressions and extension parameters
//! - [`fields`] - Schema models and their fields

mod expression;
mod fields;

pub use expression::{format_parsed_json, format_parsed_text, ParsedEntry};
pub use fields::{format_fields_json, format_fields_table};
