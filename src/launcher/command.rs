//! Launch descriptions and the AI command builder

use std::path::{Path, PathBuf};

use crate::config::ManagerConfig;
use crate::types::{CommandId, CommandRecord, ProcessRequest};

use super::config::COMMAND_ID_ENV;

/// Everything needed to start one external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable name (looked up on `PATH`) or path
    pub program: String,
    /// Arguments passed verbatim
    pub args: Vec<String>,
    /// Working directory, must exist
    pub working_dir: PathBuf,
    /// Extra environment, filtered against the deny-list at launch
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Create a spec with no arguments or extra environment
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Tag the process with its command id
    #[must_use]
    pub fn for_command(self, id: &CommandId) -> Self {
        self.env(COMMAND_ID_ENV, id.as_str())
    }

    /// Build the spec for a direct execution request
    #[must_use]
    pub fn from_process_request(request: &ProcessRequest, default_dir: &Path) -> Self {
        let working_dir = request
            .working_dir
            .clone()
            .unwrap_or_else(|| default_dir.to_path_buf());
        Self::new(request.command.trim(), working_dir).args(request.args.iter().cloned())
    }

    /// Command line for logging
    #[must_use]
    pub fn display_command(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Format the prompt handed to the AI executable
///
/// When both scope and page are known the task is prefixed with them so the
/// tool knows where to apply its changes.
#[must_use]
pub fn build_prompt(prompt: &str, scope: &str, page: &str) -> String {
    if scope.is_empty() || page.is_empty() {
        prompt.to_string()
    } else {
        format!("Scope: {scope} | Page: {page} | Task: {prompt}")
    }
}

/// Builder turning a queued AI command record into a [`LaunchSpec`]
pub struct AiCommandBuilder<'a> {
    config: &'a ManagerConfig,
    record: &'a CommandRecord,
}

impl<'a> AiCommandBuilder<'a> {
    /// Create a new builder
    pub fn new(config: &'a ManagerConfig, record: &'a CommandRecord) -> Self {
        Self { config, record }
    }

    /// Build the launch spec: configured executable, leading arguments, prompt
    #[must_use]
    pub fn build(&self) -> LaunchSpec {
        let prompt = build_prompt(&self.record.prompt, &self.record.scope, &self.record.page);
        LaunchSpec::new(&self.config.executable, &self.config.workspace_dir)
            .args(self.config.executable_args.iter().cloned())
            .arg(prompt)
            .for_command(&self.record.id)
    }
}
