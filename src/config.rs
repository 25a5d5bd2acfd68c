//! # Config Module
//!
//! Settings for the include resolver and the shader compiler. Defaults suit a debug build;
//! [`ShaderConfig::from_env`] lets the command line tool be tuned without flags.

use std::env;

use thiserror::Error;

/// Environment variable selecting the build profile, `release` turns on optimization.
pub const PROFILE_VAR: &str = "VULKANRS_SHADER_PROFILE";
/// Environment variable selecting the optimization level directly.
pub const OPT_VAR: &str = "VULKANRS_SHADER_OPT";
/// Environment variable overriding the include depth ceiling.
pub const INCLUDE_DEPTH_VAR: &str = "VULKANRS_SHADER_INCLUDE_DEPTH";
/// Environment variable selecting the malformed include policy.
pub const MALFORMED_VAR: &str = "VULKANRS_SHADER_MALFORMED";

/// Errors raised while reading configuration values.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable held a value outside of its accepted set.
    #[error("Invalid value '{value}' for {key}, expected {expected}.")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Optimization level handed to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optimization {
    #[default]
    Zero,
    Size,
    Performance,
}

impl From<Optimization> for shaderc::OptimizationLevel {
    fn from(level: Optimization) -> shaderc::OptimizationLevel {
        match level {
            Optimization::Zero => shaderc::OptimizationLevel::Zero,
            Optimization::Size => shaderc::OptimizationLevel::Size,
            Optimization::Performance => shaderc::OptimizationLevel::Performance,
        }
    }
}

/// What the resolver does with an `#include` that has no well-formed `<path>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedIncludePolicy {
    /// Leave the directive in place and keep scanning the rest of the file.
    #[default]
    Skip,
    /// Stop processing includes for the rest of the file.
    StopScanning,
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeConfig {
    /// Deepest include nesting followed before giving up on a branch.
    pub max_depth: usize,
    pub malformed: MalformedIncludePolicy,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            malformed: MalformedIncludePolicy::default(),
        }
    }
}

/// Everything needed to turn shader files into SPIR-V.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderConfig {
    pub optimization: Optimization,
    pub debug_info: bool,
    pub warnings_as_errors: bool,
    /// Name of the entry point function in every shader.
    pub entry_point: String,
    pub include: IncludeConfig,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            optimization: Optimization::default(),
            debug_info: false,
            warnings_as_errors: false,
            entry_point: String::from("main"),
            include: IncludeConfig::default(),
        }
    }
}

impl ShaderConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidValue`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidValue`]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Choose optimization based on the profile first, an explicit level wins.
        if let Some(profile) = lookup(PROFILE_VAR) {
            config.optimization = match profile.as_str() {
                "release" => Optimization::Performance,
                _ => Optimization::Zero,
            };
            config.debug_info = profile != "release";
        }

        if let Some(level) = lookup(OPT_VAR) {
            config.optimization = match level.to_ascii_lowercase().as_str() {
                "zero" | "0" => Optimization::Zero,
                "size" | "s" => Optimization::Size,
                "performance" | "perf" => Optimization::Performance,
                _ => return Err(invalid(OPT_VAR, level, "zero, size or performance")),
            };
        }

        if let Some(depth) = lookup(INCLUDE_DEPTH_VAR) {
            config.include.max_depth = match depth.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(invalid(INCLUDE_DEPTH_VAR, depth, "a positive integer")),
            };
        }

        if let Some(policy) = lookup(MALFORMED_VAR) {
            config.include.malformed = match policy.to_ascii_lowercase().as_str() {
                "skip" => MalformedIncludePolicy::Skip,
                "stop" => MalformedIncludePolicy::StopScanning,
                _ => return Err(invalid(MALFORMED_VAR, policy, "skip or stop")),
            };
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: String, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value,
        expected,
    }
}
