#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

//! Lowering and code generation for the Cinder back end.
//!
//! The pipeline per method is: bound tree ([`bound`]) → local rewriting and
//! state machine synthesis ([`lowering`]) → instruction emission ([`codegen`]).
//! [`api::Compiler`] strings the stages together and owns the module-wide
//! symbol and token tables.

// This works on std and no_std and is harmless.
extern crate alloc;

#[doc(hidden)]
pub mod shim {
    pub use alloc::{boxed::Box, fmt, format, string::String, string::ToString, vec, vec::Vec};
}

// Re-export (crate only) so other modules don't need the alloc:: prefix.
#[allow(unused_imports)]
pub(crate) use shim::*;

pub mod api;
pub mod bound;
pub mod codegen;
pub mod error;
pub mod lowering;
pub mod symbols;
pub mod syntax;

pub use error::CompileError;

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level.
    /// Call this at the start of tests where you want to see logging output.
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
