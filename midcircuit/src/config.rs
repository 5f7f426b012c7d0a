//! Runtime knobs for enumeration and staged capture.

use derive_more::Display;

/// Hard ceiling on enumerated dependencies; branch indices are `u64`.
pub const MAX_SUPPORTED_BRANCH_DEPENDENCIES: usize = 63;

/// Default bound on enumerated dependencies (about a million branches).
pub const DEFAULT_MAX_BRANCH_DEPENDENCIES: usize = 20;

const ENV_MAX_BRANCH_DEPENDENCIES: &str = "MIDCIRCUIT_MAX_BRANCH_DEPENDENCIES";
const ENV_CAPTURE: &str = "MIDCIRCUIT_CAPTURE";
const ENV_ENABLE_X64: &str = "MIDCIRCUIT_ENABLE_X64";

/// Whether measurements execute immediately or are recorded for staged compilation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    #[display("eager")]
    Eager,
    #[display("staged")]
    Staged,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Config {
    /// Enumeration over more dependencies than this fails with
    /// [`Error::TooManyBranches`](crate::Error::TooManyBranches).
    pub max_branch_dependencies: usize,
    pub capture: CaptureMode,
    /// Staged measurements report 64-bit integers instead of 32-bit ones.
    pub enable_x64: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_branch_dependencies: DEFAULT_MAX_BRANCH_DEPENDENCIES,
            capture: CaptureMode::Eager,
            enable_x64: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Defaults overridden by `MIDCIRCUIT_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        if let Some(raw) = lookup(ENV_MAX_BRANCH_DEPENDENCIES) {
            match raw.trim().parse::<usize>() {
                Ok(limit) => config = config.with_max_branch_dependencies(limit),
                Err(_) => tracing::warn!(key = ENV_MAX_BRANCH_DEPENDENCIES, %raw, "ignoring invalid value"),
            }
        }
        if let Some(raw) = lookup(ENV_CAPTURE) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "eager" => config.capture = CaptureMode::Eager,
                "staged" => config.capture = CaptureMode::Staged,
                _ => tracing::warn!(key = ENV_CAPTURE, %raw, "ignoring invalid value"),
            }
        }
        if let Some(raw) = lookup(ENV_ENABLE_X64) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.enable_x64 = true,
                "0" | "false" | "no" => config.enable_x64 = false,
                _ => tracing::warn!(key = ENV_ENABLE_X64, %raw, "ignoring invalid value"),
            }
        }
        config
    }

    /// Values above [`MAX_SUPPORTED_BRANCH_DEPENDENCIES`] are clamped.
    pub fn with_max_branch_dependencies(mut self, limit: usize) -> Self {
        self.max_branch_dependencies = limit.min(MAX_SUPPORTED_BRANCH_DEPENDENCIES);
        self
    }

    pub fn with_capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_x64(mut self, enable_x64: bool) -> Self {
        self.enable_x64 = enable_x64;
        self
    }

    pub(crate) fn branch_limit(&self) -> usize {
        self.max_branch_dependencies.min(MAX_SUPPORTED_BRANCH_DEPENDENCIES)
    }
}
