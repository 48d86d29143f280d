#![doc(test(attr(deny(warnings))))]

//! Wizard Core is an engine for multi-step onboarding forms: ordered steps,
//! per-step validation, derived fields, backend verification and a
//! submission gate that suppresses duplicate submits.

pub mod cli;
pub mod config;
pub mod errors;
pub mod flows;
pub mod utils;
pub mod wizard;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Wizard Core tracing initialized.");
    });
}
