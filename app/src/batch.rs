//! Line-delimited JSON command runner
//!
//! Each input line is one request; each request gets exactly one response
//! line, in order.
//!
//! ```text
//! {"id":"1","caller":"tab-1","command":"connect","args":{"url":"opc.tcp://localhost:4840"}}
//! {"id":"1","command":"connect","success":true,"data":{"connected":true,...},"error":null,"error_kind":null}
//! {"id":"2","caller":"tab-1","command":"get_nodes","args":{"node_id":""}}
//! {"command":"quit"}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{
    browse, configuration, connection, selection, CommandResult, ErrorKind,
};
use crate::state::AppState;

const DEFAULT_CALLER: &str = "default";

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub id: Option<String>,
    /// Key the session is looked up by
    #[serde(default)]
    pub caller: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub command: String,
    #[serde(flatten)]
    pub result: CommandResult<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct NodeIdArgs {
    #[serde(default)]
    node_id: String,
}

#[derive(Debug, Deserialize)]
struct ImportArgs {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

fn parse_args<T: DeserializeOwned>(args: &serde_json::Value) -> Result<T, CommandResult<serde_json::Value>> {
    let args = if args.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args)
        .map_err(|e| CommandResult::err(ErrorKind::InvalidInput, format!("Invalid arguments: {}", e)))
}

macro_rules! with_args {
    ($request:expr, $ty:ty, |$args:ident| $body:expr) => {
        match parse_args::<$ty>(&$request.args) {
            Ok($args) => $body.into_value(),
            Err(err) => err,
        }
    };
}

/// Run one request against the application state
pub async fn dispatch(state: &AppState, request: &BatchRequest) -> BatchResponse {
    let caller = request.caller.as_deref().unwrap_or(DEFAULT_CALLER);

    let result = match request.command.as_str() {
        "ping" => CommandResult::ok(serde_json::Value::Null),
        "connect" => with_args!(request, nodecfg_core::ServerConnectionConfig, |server| {
            connection::connect(state, caller, server).await
        }),
        "disconnect" => connection::disconnect(state, caller).await.into_value(),
        "connection_info" => connection::connection_info(state, caller).into_value(),
        "get_nodes" => with_args!(request, NodeIdArgs, |args| {
            browse::get_nodes(state, caller, &args.node_id).await
        }),
        "read_value" => with_args!(request, NodeIdArgs, |args| {
            browse::read_value(state, caller, &args.node_id).await
        }),
        "select_node" => with_args!(request, selection::SelectNodeArgs, |args| {
            selection::select_node(state, caller, args)
        }),
        "unselect_node" => with_args!(request, NodeIdArgs, |args| {
            selection::unselect_node(state, caller, &args.node_id)
        }),
        "get_selected" => selection::get_selected(state, caller).into_value(),
        "clear_selection" => selection::clear_selection(state, caller).into_value(),
        "export_configuration" => with_args!(request, configuration::ExportArgs, |args| {
            configuration::export_configuration(state, caller, args).await
        }),
        "import_configuration" => match parse_args::<ImportArgs>(&request.args) {
            Ok(args) => import(state, caller, args).await,
            Err(err) => err,
        },
        "end_session" => CommandResult::ok(state.end_caller(caller).await).into_value(),
        other => CommandResult::err(ErrorKind::InvalidInput, format!("Unknown command: {}", other)),
    };

    BatchResponse {
        id: request.id.clone(),
        command: request.command.clone(),
        result,
    }
}

async fn import(state: &AppState, caller: &str, args: ImportArgs) -> CommandResult<serde_json::Value> {
    let content = match (args.content, args.path) {
        (Some(content), _) => content,
        (None, Some(path)) => match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => return CommandResult::err(ErrorKind::Io, format!("{}: {}", path, e)),
        },
        (None, None) => {
            return CommandResult::err(ErrorKind::InvalidInput, "content or path is required".into())
        }
    };

    configuration::import_configuration(state, caller, &content).into_value()
}

/// Serve requests from `reader` until EOF or `quit`
pub async fn run<R, W>(state: &AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: BatchRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                let response = BatchResponse {
                    id: None,
                    command: "unknown".to_string(),
                    result: CommandResult::err(ErrorKind::InvalidInput, e.to_string()),
                };
                write_response(&mut writer, &response)?;
                continue;
            }
        };

        if matches!(request.command.as_str(), "quit" | "exit") {
            let response = BatchResponse {
                id: request.id,
                command: "quit".to_string(),
                result: CommandResult::ok(serde_json::Value::Null),
            };
            write_response(&mut writer, &response)?;
            break;
        }

        tracing::debug!(command = %request.command, caller = ?request.caller, "Dispatching");
        let response = dispatch(state, &request).await;
        write_response(&mut writer, &response)?;
    }

    Ok(())
}

fn write_response<W: Write>(writer: &mut W, response: &BatchResponse) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
