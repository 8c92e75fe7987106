//! Compilation options.
//!
//! [`CompileOptions`] holds the settings for a whole [`Compiler`](super::Compiler).
//! A [`CompileOptionsOverride`] changes some of them for a single method and
//! is merged in with [`CompileOptions::override_with`].

/// How much the emitted code favors debugging over size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    /// Every user local survives suspension and markers emit a `nop`.
    #[default]
    Debug,
    /// Only locals live across a suspension point are hoisted.
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub optimization: OptimizationLevel,
    /// Wrap user statements in instrumentation markers and record sequence
    /// points for them.
    pub instrument: bool,
    /// Run the stack verifier over every emitted method.
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimization: OptimizationLevel::Debug,
            instrument: true,
            verify: true,
        }
    }
}

impl CompileOptions {
    pub fn release() -> Self {
        Self {
            optimization: OptimizationLevel::Release,
            instrument: false,
            verify: true,
        }
    }

    /// Applies every field set in `overrides`.
    pub fn override_with(&mut self, overrides: &CompileOptionsOverride) {
        if let Some(optimization) = overrides.optimization {
            self.optimization = optimization;
        }
        if let Some(instrument) = overrides.instrument {
            self.instrument = instrument;
        }
        if let Some(verify) = overrides.verify {
            self.verify = verify;
        }
    }

    pub fn is_debug(&self) -> bool {
        self.optimization == OptimizationLevel::Debug
    }
}

/// Per-method changes to [`CompileOptions`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptionsOverride {
    pub optimization: Option<OptimizationLevel>,
    pub instrument: Option<bool>,
    pub verify: Option<bool>,
}
