mod normalize;
mod prompts;
#[cfg(test)]
mod tests;
mod types;

use std::sync::Arc;

use crate::application::SharedWorkspace;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::schema::UnifiedSchema;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::extract_json_payload;

use normalize::normalize_output;
use prompts::{build_system_prompt, build_user_prompt};
use types::{FileSnapshot, UnificationOutput};

pub struct SchemaUnificationUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    workspace: SharedWorkspace,
    sample_rows: usize,
}

impl SchemaUnificationUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        workspace: SharedWorkspace,
        sample_rows: usize,
    ) -> Self {
        Self {
            llm_client,
            workspace,
            sample_rows,
        }
    }

    /// Ask the model for a unified schema over the current files and store it.
    /// The workspace lock is not held while the request is in flight.
    pub async fn execute(&self, config: &LLMConfig) -> Result<UnifiedSchema> {
        let (generation, files) = self.snapshot()?;
        if files.is_empty() {
            return Err(AppError::ValidationError(
                "Upload at least one file before unifying columns".to_string(),
            ));
        }

        let system_prompt = build_system_prompt();
        let user_prompt = build_user_prompt(&files);

        tracing::info!(
            files = files.len(),
            provider = ?config.provider,
            model = %config.model,
            "Requesting schema unification"
        );

        let raw = self
            .llm_client
            .generate(config, &system_prompt, &user_prompt)
            .await?;

        let output = parse_output(&raw)?;
        let schema = normalize_output(output, &files);

        self.workspace
            .lock()?
            .set_schema(schema.clone(), generation)?;

        tracing::info!(columns = schema.columns.len(), "Unified schema stored");
        Ok(schema)
    }

    pub fn current(&self) -> Result<Option<UnifiedSchema>> {
        Ok(self.workspace.lock()?.schema().cloned())
    }

    fn snapshot(&self) -> Result<(u64, Vec<FileSnapshot>)> {
        let workspace = self.workspace.lock()?;
        let files = workspace
            .files()
            .iter()
            .map(|file| FileSnapshot {
                name: file.name.clone(),
                headers: file.table.headers.clone(),
                sample: file.table.sample(self.sample_rows),
            })
            .collect();
        Ok((workspace.generation(), files))
    }
}

fn parse_output(raw: &str) -> Result<UnificationOutput> {
    let payload = extract_json_payload(raw);
    let output: UnificationOutput = serde_json::from_str(&payload).map_err(|e| {
        AppError::LLMError(format!("Model returned malformed schema JSON: {}", e))
    })?;

    if output.unified_columns.is_empty() && output.mappings.is_empty() {
        return Err(AppError::LLMError(
            "Model returned an empty schema".to_string(),
        ));
    }
    Ok(output)
}
