//! Export and import commands
use chrono::Local;
use nodecfg_core::{export_file_name, ExportFormat, ImportSummary};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{CommandResult, ErrorKind};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ExportArgs {
    pub format: ExportFormat,
    #[serde(default)]
    pub name: String,
    /// Also write the file into the configured export directory
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportInfo {
    pub file_name: String,
    pub mime_type: String,
    pub node_count: usize,
    pub content: String,
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportInfo {
    pub added: usize,
    pub skipped: usize,
    pub count: usize,
}

pub async fn export_configuration(
    state: &AppState,
    caller: &str,
    args: ExportArgs,
) -> CommandResult<ExportInfo> {
    let session_id = state.session_id_for(caller);
    let configurator = state.configurator();

    let snapshot = configurator.export_snapshot(&session_id, &args.name);
    let content = match snapshot.render(args.format) {
        Ok(content) => content,
        Err(e) => return CommandResult::err(ErrorKind::from(&e), e.to_string()),
    };
    let file_name = export_file_name(args.format, &Local::now());

    let saved_to = if args.save {
        let dir = configurator.config().export_dir;
        let path = dir.join(&file_name);
        let written = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, content.as_bytes()).await
        };
        if let Err(e) = written.await {
            tracing::error!(path = %path.display(), error = %e, "Failed to write export");
            return CommandResult::err(
                ErrorKind::Io,
                format!("Failed to write {}: {}", path.display(), e),
            );
        }
        tracing::info!(
            path = %path.display(),
            nodes = snapshot.selected_nodes.len(),
            "Exported configuration"
        );
        Some(path)
    } else {
        None
    };

    CommandResult::ok(ExportInfo {
        file_name,
        mime_type: args.format.mime_type().to_string(),
        node_count: snapshot.selected_nodes.len(),
        content,
        saved_to,
    })
}

pub fn import_configuration(state: &AppState, caller: &str, content: &str) -> CommandResult<ImportInfo> {
    let session_id = state.session_id_for(caller);
    let configurator = state.configurator();

    match configurator.import_json(&session_id, content) {
        Ok(ImportSummary { added, skipped }) => CommandResult::ok(ImportInfo {
            added,
            skipped,
            count: configurator.sessions().selected_count(&session_id),
        }),
        Err(e) => CommandResult::err(ErrorKind::Import, e.to_string()),
    }
}
