//! Session creation
//!
//! A submission writes a queued record, registers a session and returns its
//! id. Nothing runs until a client attaches.

use std::sync::Arc;

use crate::error::{CommandError, Result};
use crate::launcher::{AiCommandBuilder, LaunchSpec};
use crate::session::Session;
use crate::types::{CommandId, CommandRecord, CommandRequest, CommandResult, ProcessRequest};

use super::super::helpers::label_for;
use super::core::CommandManager;

impl CommandManager {
    /// Submit a natural-language command for the configured executable
    ///
    /// # Errors
    /// `MissingPrompt` / `InvalidScope` for a bad request, `Persistence` if
    /// the queued record cannot be created
    pub async fn submit(&self, request: CommandRequest) -> Result<CommandId> {
        let scope = request.validate()?;
        let id = CommandId::generate();
        let record = CommandRecord::queued(id, &request, scope);
        let spec = AiCommandBuilder::new(&self.config, &record).build();
        let success_result = CommandResult::for_page(&record.page, &self.config.executable);

        log::info!(
            "AI command received: \"{}\" | Scope: {} | Page: {}",
            record.prompt,
            record.scope,
            record.page
        );
        self.open_session(record, spec, success_result).await
    }

    /// Submit a direct execution of an arbitrary executable
    ///
    /// # Errors
    /// `Forbidden` unless custom commands are enabled, `InvalidRequest` for a
    /// missing command, `Persistence` if the record cannot be created
    pub async fn submit_process(&self, request: ProcessRequest) -> Result<CommandId> {
        if !self.config.allow_custom_commands {
            return Err(CommandError::Forbidden(
                "custom command execution is disabled".to_string(),
            ));
        }
        request.validate()?;

        let id = CommandId::generate();
        let spec = LaunchSpec::from_process_request(&request, &self.config.workspace_dir).for_command(&id);
        let record = CommandRecord::queued_process(id, &request);
        let success_result = CommandResult::for_process(&spec.program);

        log::info!("Process command received: {}", spec.display_command());
        self.open_session(record, spec, success_result).await
    }

    async fn open_session(
        &self,
        record: CommandRecord,
        spec: LaunchSpec,
        success_result: CommandResult,
    ) -> Result<CommandId> {
        self.store.create(&record).await?;

        let id = record.id.clone();
        let label = label_for(&record.prompt);
        let session = Arc::new(Session::new(
            record,
            spec,
            success_result,
            label,
            self.config.queue_capacity,
        ));
        self.registry.register(session)?;

        log::debug!("[{id}] Session queued");
        Ok(id)
    }
}
