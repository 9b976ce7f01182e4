//! Command line entry points.
//!
//! Usage:
//!     compileai serve --port 3001
//!     compileai merge crm.csv shop.sql --mode intersection -o merged.csv

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};

use crate::application::{ExportOptions, IncomingFile};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMProvider;
use crate::domain::schema::MergeMode;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm_clients::RouterClient;
use crate::interfaces::http::start_server;
use crate::interfaces::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "compileai",
    version,
    about = "Merge CSV files and SQL dumps into one CSV, unifying column names with an LLM"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the local HTTP API used by the browser UI
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show type, row count and headers of each file
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Merge files into a single CSV
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// intersection (strict) or union (maximal). Defaults to config.
        #[arg(long)]
        mode: Option<MergeMode>,
        /// Comma separated list of columns to keep
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Skip LLM unification and merge on the raw headers
        #[arg(long)]
        no_ai: bool,
        /// Add a column holding each row's file name
        #[arg(long)]
        include_source: bool,
        /// Output file. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage provider API keys in the OS keyring
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// List models offered by the configured provider
    Models,
}

#[derive(Subcommand, Debug, Clone)]
pub enum KeyAction {
    Set { provider: LLMProvider, key: String },
    Delete { provider: LLMProvider },
}

/// Load configuration, build the app state and run one command
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Command::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    let state = Arc::new(AppState::new(config, Arc::new(RouterClient::new())));

    if let Command::Serve { .. } = cli.command {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let server = start_server(state, logs)?;
        return server.await.map_err(AppError::from);
    }

    let stdout = std::io::stdout();
    execute(cli.command, &state, &mut stdout.lock()).await
}

/// Run a non-server command, writing user facing output to `out`
pub async fn execute(command: Command, state: &AppState, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Serve { .. } => Err(AppError::Internal(
            "serve must be started through run()".to_string(),
        )),
        Command::Inspect { files } => inspect(state, &files, out),
        Command::Merge {
            files,
            mode,
            columns,
            no_ai,
            include_source,
            output,
        } => {
            let options = ExportOptions {
                mode: mode.unwrap_or(state.config.export.default_mode),
                include_source: include_source || state.config.export.include_source,
            };
            merge(state, &files, options, &columns, no_ai, output.as_deref(), out).await
        }
        Command::Key { action } => manage_key(state, action, out),
        Command::Models => {
            let config = state.llm_config(None)?;
            for model in state.llm_client.list_models(&config).await? {
                writeln!(out, "{}", model)?;
            }
            Ok(())
        }
    }
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<IncomingFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|e| {
                AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(IncomingFile::new(name, None, bytes))
        })
        .collect()
}

fn inspect(state: &AppState, paths: &[PathBuf], out: &mut dyn Write) -> Result<()> {
    let added = state.file_intake_use_case.execute(read_files(paths)?)?;
    for file in added {
        writeln!(out, "{} ({} rows)", file, file.rows)?;
        writeln!(out, "  {}", file.columns.join(", "))?;
    }
    Ok(())
}

async fn merge(
    state: &AppState,
    paths: &[PathBuf],
    options: ExportOptions,
    columns: &[String],
    no_ai: bool,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    state.file_intake_use_case.execute(read_files(paths)?)?;

    if !no_ai {
        let config = state.llm_config(None)?;
        state.schema_unification_use_case.execute(&config).await?;
    }

    if !columns.is_empty() {
        let wanted: Vec<String> = columns
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        state.column_selection_use_case.select_only(&wanted)?;
    }

    let exported = state.export_use_case.execute(options)?;

    match output {
        Some(path) => {
            std::fs::write(path, exported.csv.as_bytes())?;
            tracing::info!(path = %path.display(), rows = exported.row_count, "Wrote merged CSV");
        }
        None => out.write_all(exported.csv.as_bytes())?,
    }
    Ok(())
}

fn manage_key(state: &AppState, action: KeyAction, out: &mut dyn Write) -> Result<()> {
    match action {
        KeyAction::Set { provider, key } => {
            state.config_service.save_api_key(provider, key.trim())?;
            writeln!(out, "Saved API key for {}", provider.key_name())?;
        }
        KeyAction::Delete { provider } => {
            state.config_service.delete_api_key(provider)?;
            writeln!(out, "Deleted API key for {}", provider.key_name())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMConfig;
    use crate::infrastructure::llm_clients::LLMClient;
    use async_trait::async_trait;

    struct FakeLLMClient;

    #[async_trait]
    impl LLMClient for FakeLLMClient {
        async fn generate(&self, _config: &LLMConfig, _system: &str, _user: &str) -> Result<String> {
            Ok(r#"{"unified_columns": ["id", "email"],
                   "mappings": {"a.csv": {"id": "id", "mail": "email"},
                                "b.sql": {"user_id": "id", "email": "email"}}}"#
                .to_string())
        }

        async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
            Ok(vec!["m-1".to_string(), "m-2".to_string()])
        }
    }

    fn state() -> AppState {
        AppState::new(AppConfig::default(), Arc::new(FakeLLMClient))
    }

    fn fixtures(dir: &Path) -> Vec<PathBuf> {
        let a = dir.join("a.csv");
        let b = dir.join("b.sql");
        std::fs::write(&a, "id,mail,city\n1,ana@x.io,Lisbon\n").unwrap();
        std::fs::write(
            &b,
            "CREATE TABLE users (user_id INT, email VARCHAR(64));\n\
             INSERT INTO users VALUES (2, 'bo@x.io');\n",
        )
        .unwrap();
        vec![a, b]
    }

    #[test]
    fn test_parse_merge_arguments() {
        let cli = Cli::try_parse_from([
            "compileai",
            "merge",
            "a.csv",
            "b.sql",
            "--mode",
            "strict",
            "--columns",
            "id,email",
            "--no-ai",
            "-o",
            "out.csv",
        ])
        .unwrap();

        match cli.command {
            Command::Merge {
                files,
                mode,
                columns,
                no_ai,
                output,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(mode, Some(MergeMode::Intersection));
                assert_eq!(columns, vec!["id", "email"]);
                assert!(no_ai);
                assert_eq!(output, Some(PathBuf::from("out.csv")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_key_provider() {
        let cli = Cli::try_parse_from(["compileai", "key", "delete", "google"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Key {
                action: KeyAction::Delete {
                    provider: LLMProvider::Gemini
                }
            }
        ));
        assert!(Cli::try_parse_from(["compileai", "key", "delete", "bedrock"]).is_err());
    }

    #[tokio::test]
    async fn test_merge_with_unification_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = fixtures(dir.path());
        let output = dir.path().join("merged.csv");
        let mut out = Vec::new();

        execute(
            Command::Merge {
                files,
                mode: Some(MergeMode::Intersection),
                columns: Vec::new(),
                no_ai: false,
                include_source: true,
                output: Some(output.clone()),
            },
            &state(),
            &mut out,
        )
        .await
        .unwrap();

        assert!(out.is_empty());
        assert_eq!(
            std::fs::read_to_string(output).unwrap(),
            "source_file,id,email\na.csv,1,ana@x.io\nb.sql,2,bo@x.io\n"
        );
    }

    #[tokio::test]
    async fn test_merge_without_ai_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();

        execute(
            Command::Merge {
                files: fixtures(dir.path()),
                mode: None,
                columns: vec!["id".to_string(), " user_id ".to_string()],
                no_ai: true,
                include_source: false,
                output: None,
            },
            &state(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "id,user_id\n1,\n,2\n");
    }

    #[tokio::test]
    async fn test_inspect_rejects_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let mut out = Vec::new();

        let err = execute(Command::Inspect { files: vec![path] }, &state(), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "One of your files is not a supported data type");
    }

    #[tokio::test]
    async fn test_inspect_and_models_output() {
        let dir = tempfile::tempdir().unwrap();
        let state = state();
        let mut out = Vec::new();

        execute(
            Command::Inspect {
                files: fixtures(dir.path()),
            },
            &state,
            &mut out,
        )
        .await
        .unwrap();
        execute(Command::Models, &state, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("a.csv - text/csv (1 rows)"));
        assert!(text.contains("  user_id, email"));
        assert!(text.ends_with("m-1\nm-2\n"));
    }
}
