//! Core vocabulary for arraytab.
//!
//! This crate defines the element-type/relational-type translation tables,
//! tagged value payloads, access modes, and the error taxonomy shared by the
//! engine and table crates.

pub mod error;
pub mod types;
