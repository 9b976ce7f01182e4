use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::types::FileSnapshot;
use super::*;
use crate::domain::tabular::{SupportedFileType, Table, UploadedFile};
use crate::domain::workspace::Workspace;

/// Returns a canned reply and records the prompts it saw
struct FakeLLMClient {
    reply: Result<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLLMClient {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(err: AppError) -> Self {
        Self {
            reply: Err(err),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LLMClient for FakeLLMClient {
    async fn generate(&self, _config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user.to_string());
        self.reply.clone()
    }

    async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
        Ok(vec!["fake".to_string()])
    }
}

fn upload(name: &str, headers: &[&str], rows: Vec<Vec<&str>>) -> UploadedFile {
    let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    UploadedFile::new(
        name.to_string(),
        SupportedFileType::Csv,
        Table::from_records(&headers, rows),
    )
}

fn workspace_with_two_files() -> SharedWorkspace {
    let mut workspace = Workspace::new();
    workspace.add_files(vec![
        upload("crm.csv", &["Full Name", "E-mail"], vec![vec!["Ana", "ana@x.io"]]),
        upload("shop.csv", &["name", "mail", "total"], vec![vec!["Bo", "bo@x.io", "9"]]),
    ]);
    Arc::new(Mutex::new(workspace))
}

fn snapshot(name: &str, headers: &[&str]) -> FileSnapshot {
    FileSnapshot {
        name: name.to_string(),
        headers: headers.iter().map(|s| s.to_string()).collect(),
        sample: Vec::new(),
    }
}

const GOOD_REPLY: &str = r#"```json
{
  "unified_columns": ["name", "email", "total"],
  "mappings": {
    "crm.csv": {"Full Name": "name", "E-mail": "email"},
    "shop.csv": {"name": "name", "mail": "email", "total": "total"}
  }
}
```"#;

#[tokio::test]
async fn test_execute_stores_schema_and_rebuilds_selection() {
    let workspace = workspace_with_two_files();
    let client = Arc::new(FakeLLMClient::replying(GOOD_REPLY));
    let use_case = SchemaUnificationUseCase::new(client.clone(), workspace.clone(), 3);

    let schema = use_case.execute(&LLMConfig::default()).await.unwrap();

    assert_eq!(schema.columns, vec!["name", "email", "total"]);
    assert_eq!(schema.unified_name("crm.csv", "E-mail"), "email");

    let ws = workspace.lock().unwrap();
    assert_eq!(ws.discovered_columns(), vec!["name", "email", "total"]);
    assert!(ws.selection().is_selected("email"));
    assert!(!ws.selection().as_map().contains_key("E-mail"));

    let prompts = client.prompts.lock().unwrap();
    assert!(prompts[0].contains("File: shop.csv"));
    assert!(prompts[0].contains("| Bo | bo@x.io | 9 |"));
}

#[tokio::test]
async fn test_execute_without_files_is_validation_error() {
    let workspace: SharedWorkspace = Arc::new(Mutex::new(Workspace::new()));
    let use_case = SchemaUnificationUseCase::new(
        Arc::new(FakeLLMClient::replying(GOOD_REPLY)),
        workspace,
        3,
    );

    assert!(matches!(
        use_case.execute(&LLMConfig::default()).await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_malformed_reply_is_llm_error_and_keeps_workspace() {
    let workspace = workspace_with_two_files();
    let use_case = SchemaUnificationUseCase::new(
        Arc::new(FakeLLMClient::replying("I cannot help with that.")),
        workspace.clone(),
        3,
    );

    assert!(matches!(
        use_case.execute(&LLMConfig::default()).await,
        Err(AppError::LLMError(_))
    ));
    assert!(workspace.lock().unwrap().schema().is_none());
}

#[tokio::test]
async fn test_client_error_is_propagated() {
    let workspace = workspace_with_two_files();
    let use_case = SchemaUnificationUseCase::new(
        Arc::new(FakeLLMClient::failing(AppError::LLMError(
            "API error (401 Unauthorized): bad key".to_string(),
        ))),
        workspace,
        3,
    );

    let err = use_case.execute(&LLMConfig::default()).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[test]
fn test_normalize_fills_gaps_and_drops_unknowns() {
    let files = vec![
        snapshot("a.csv", &["id", "Mail", "notes"]),
        snapshot("b.csv", &["ID", "email"]),
    ];
    let output: UnificationOutput = serde_json::from_str(
        r#"{
            "unified_columns": ["id", "email", "phone", "email", " "],
            "mappings": {
                "A.CSV": {"id": "id", "mail": "email", "ghost": "ghost"},
                "b.csv": {"ID": "id", "email": "email"},
                "c.csv": {"x": "y"}
            }
        }"#,
    )
    .unwrap();

    let schema = normalize_output(output, &files);

    // "phone" has no source column, "notes" was left unmapped
    assert_eq!(schema.columns, vec!["id", "email", "notes"]);
    assert_eq!(schema.unified_name("a.csv", "Mail"), "email");
    assert_eq!(schema.unified_name("a.csv", "notes"), "notes");
    assert_eq!(schema.mapping_for("a.csv").unwrap().len(), 3);
    assert!(schema.mapping_for("c.csv").is_none());
}

#[test]
fn test_parse_output_accepts_aliases() {
    let output = parse_output(r#"{"columns": ["a"], "mapping": {"f.csv": {"A": "a"}}}"#).unwrap();
    assert_eq!(output.unified_columns, vec!["a"]);
    assert_eq!(output.mappings["f.csv"]["A"], "a");
}

#[test]
fn test_parse_output_rejects_empty_object() {
    assert!(matches!(parse_output("{}"), Err(AppError::LLMError(_))));
}

/// Changes the file set while the request is in flight, then replies normally
struct MutatingLLMClient {
    workspace: SharedWorkspace,
    mutate: fn(&mut Workspace),
}

#[async_trait]
impl LLMClient for MutatingLLMClient {
    async fn generate(&self, _config: &LLMConfig, _system: &str, _user: &str) -> Result<String> {
        (self.mutate)(&mut self.workspace.lock().unwrap());
        Ok(GOOD_REPLY.to_string())
    }

    async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

async fn run_with_mutation(mutate: fn(&mut Workspace)) -> (Result<UnifiedSchema>, SharedWorkspace) {
    let workspace = workspace_with_two_files();
    let client = Arc::new(MutatingLLMClient {
        workspace: workspace.clone(),
        mutate,
    });
    let use_case = SchemaUnificationUseCase::new(client, workspace.clone(), 3);
    (use_case.execute(&LLMConfig::default()).await, workspace)
}

#[tokio::test]
async fn test_reset_during_request_discards_schema() {
    let (result, workspace) = run_with_mutation(|ws| ws.reset()).await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    let ws = workspace.lock().unwrap();
    assert!(ws.schema().is_none());
    assert!(ws.is_empty());
}

#[tokio::test]
async fn test_upload_during_request_discards_schema() {
    let (result, workspace) = run_with_mutation(|ws| {
        ws.add_files(vec![upload("late.csv", &["sku"], vec![vec!["X1"]])]);
    })
    .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    let ws = workspace.lock().unwrap();
    assert!(ws.schema().is_none());
    assert!(ws.selection().is_selected("sku"));
    assert!(ws.selection().is_selected("Full Name"));
}
