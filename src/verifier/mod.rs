//! # Verification harness.
//!
//! [`StepVerifier`] scripts the exact signal sequence a publisher must produce
//! and checks it against a live subscription, optionally on a virtual clock.
//!
//! ## Contents
//! - [`StepVerifier`] builder and runner
//! - [`VerifierConfig`] per-run settings (wait bound, initial demand)
//! - [`Verified`] success report
//! - recording subscriber (internal) forwarding signals and protocol
//!   violations to the runner

mod config;
mod recorder;
mod report;
mod step;
mod step_verifier;

pub use config::VerifierConfig;
pub use report::Verified;
pub use step_verifier::StepVerifier;
