//! mdt: manage markdown-ticket projects from one shared registry
//!
//! Every interface (CLI here; web and MCP adapters elsewhere) talks to the
//! same [`core::ProjectService`], so all of them see identical records and
//! identical errors.

pub mod cli;
pub mod core;
