//! Command handlers.
//!
//! Each handler takes resolved settings plus its own arguments, drives the
//! library crates and formats the result for the terminal.

pub mod demo;
pub mod replay;
pub mod settings;
