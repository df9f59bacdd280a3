//! Environment constants for launched processes

/// Environment variables that callers may not set on a launched process
///
/// These change how the process loads and executes code. `PATH` is included
/// so a submission cannot redirect executable lookup.
pub const DANGEROUS_ENV_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "PERL5LIB",
    "RUBYLIB",
];

/// Variable carrying the command id into the launched process
pub const COMMAND_ID_ENV: &str = "KODEGEN_COMMAND_ID";

/// Whether `key` may be passed to a launched process
pub(super) fn is_allowed_env(key: &str) -> bool {
    !key.is_empty() && !DANGEROUS_ENV_VARS.contains(&key)
}
