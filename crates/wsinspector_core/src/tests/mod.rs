//! Integration tests for the inspection engine
//!
//! Tests are organized by topic:
//! - `fixtures` - Shared models built with the builder DSL
//! - `builder_dsl` - Builder DSL naming conventions and resolution
//! - `snapshot` - Capture/restore round trips and bulk state operations
//! - `scan` - Sensitivity scan scenarios, idempotence and degenerate yields
//! - `inspect` - Full runs, validation failures and auxiliary tables

mod fixtures;
mod inspect;
mod scan;
