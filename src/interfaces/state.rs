use std::sync::{Arc, Mutex};

use validator::Validate;

use crate::application::{
    ColumnSelectionUseCase, ExportUseCase, FileIntakeUseCase, SchemaUnificationUseCase,
    SharedWorkspace,
};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::workspace::Workspace;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::llm_clients::LLMClient;

/// Use cases and shared services behind both the HTTP API and the CLI
pub struct AppState {
    pub config: AppConfig,
    pub config_service: ConfigService,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub workspace: SharedWorkspace,
    pub file_intake_use_case: FileIntakeUseCase,
    pub column_selection_use_case: ColumnSelectionUseCase,
    pub schema_unification_use_case: SchemaUnificationUseCase,
    pub export_use_case: ExportUseCase,
}

impl AppState {
    pub fn new(config: AppConfig, llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        let workspace: SharedWorkspace = Arc::new(Mutex::new(Workspace::new()));

        Self {
            file_intake_use_case: FileIntakeUseCase::new(workspace.clone()),
            column_selection_use_case: ColumnSelectionUseCase::new(workspace.clone()),
            schema_unification_use_case: SchemaUnificationUseCase::new(
                llm_client.clone(),
                workspace.clone(),
                config.unify.sample_rows,
            ),
            export_use_case: ExportUseCase::new(workspace.clone()),
            config_service: ConfigService::new(),
            llm_client,
            workspace,
            config,
        }
    }

    /// The configured model settings, or a caller supplied override,
    /// validated and with the API key filled from the keyring if missing.
    pub fn llm_config(&self, requested: Option<LLMConfig>) -> Result<LLMConfig> {
        let mut config = requested.unwrap_or_else(|| self.config.llm.clone());
        config
            .validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid model settings: {}", e)))?;
        self.config_service.resolve_api_key(&mut config);
        Ok(config)
    }
}
