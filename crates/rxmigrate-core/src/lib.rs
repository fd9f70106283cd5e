//! Core infrastructure for rxmigrate.
//!
//! This crate provides the language-agnostic pieces shared by the parser
//! crate and the rewrite rules:
//! - Patch IR: spans, edits, conflict detection and application
//! - Finding records and their JSON rendering
//! - Error types
//! - Text position utilities

pub mod error;
pub mod output;
pub mod patch;
pub mod text;
pub mod types;
