// src/exec/mod.rs

//! Process execution layer.
//!
//! Responsible for actually running the shell scripts configured on actions,
//! using `tokio::process::Command`, and classifying what happened.
//!
//! - [`script`] implements `[field]` template substitution.
//! - [`runner`] owns spawning, the timeout/output-cap kill logic, outcome
//!   classification and success side effects. It also defines the
//!   [`ActionRunner`] trait the dispatch queue drives, so tests can swap in
//!   fakes that never spawn real processes.

pub mod runner;
pub mod script;

pub use runner::{execute, ActionRunner, Outcome, ShellRunner, MAX_OUTPUT_BYTES};
pub use script::substitute;
