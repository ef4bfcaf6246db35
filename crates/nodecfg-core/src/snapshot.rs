//! Configuration snapshots
//!
//! A snapshot is what leaves the process: the selection of one session plus
//! the connection it was made against. JSON is the only format read back;
//! XML and CSV are write-only renderings.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use nodecfg_nodes::{SelectedNode, ServerConnectionConfig};

use crate::error::CoreError;
use crate::Result;

pub const DEFAULT_SNAPSHOT_NAME: &str = "NodeConfiguration";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSnapshot {
    #[serde(alias = "Name", default)]
    pub name: String,
    #[serde(
        alias = "CreatedDate",
        alias = "createdAt",
        deserialize_with = "deserialize_created_date"
    )]
    pub created_date: DateTime<Utc>,
    #[serde(alias = "ServerConfig", default, skip_serializing_if = "Option::is_none")]
    pub server_config: Option<ServerConnectionConfig>,
    #[serde(alias = "SelectedNodes", default)]
    pub selected_nodes: Vec<SelectedNode>,
}

/// Accepts RFC 3339 or an offset-less timestamp, which is taken as UTC
fn deserialize_created_date<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(serde::de::Error::custom)
}

impl ConfigurationSnapshot {
    pub fn new(name: impl Into<String>, selected_nodes: Vec<SelectedNode>) -> Self {
        let name = name.into();
        Self {
            name: if name.trim().is_empty() {
                DEFAULT_SNAPSHOT_NAME.to_string()
            } else {
                name
            },
            created_date: Utc::now(),
            server_config: None,
            selected_nodes,
        }
    }

    /// Attach the connection, never including its password
    pub fn with_server_config(mut self, config: &ServerConnectionConfig) -> Self {
        self.server_config = Some(config.without_secrets());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<NodeConfiguration>\n");
        push_element(&mut out, 1, "Name", &self.name);
        push_element(
            &mut out,
            1,
            "CreatedDate",
            &self.created_date.format("%Y-%m-%d %H:%M:%S").to_string(),
        );

        if let Some(server) = &self.server_config {
            out.push_str("    <ServerConfig>\n");
            push_element(&mut out, 2, "Url", &server.url);
            push_element(&mut out, 2, "SecurityMode", server.security_mode.as_str());
            push_element(&mut out, 2, "SecurityPolicy", server.security_policy.as_str());
            out.push_str("    </ServerConfig>\n");
        }

        out.push_str("    <SelectedNodes>\n");
        for node in &self.selected_nodes {
            out.push_str("        <Node>\n");
            push_element(&mut out, 3, "NodeId", &node.id);
            push_element(&mut out, 3, "DisplayName", &node.display_name);
            push_element(&mut out, 3, "BrowseName", &node.browse_name);
            push_element(&mut out, 3, "DataType", &node.data_type);
            if let Some(alias) = &node.alias {
                push_element(&mut out, 3, "Alias", alias);
            }
            push_element(&mut out, 3, "NamespaceIndex", &node.namespace_index.to_string());
            out.push_str("        </Node>\n");
        }
        out.push_str("    </SelectedNodes>\n");
        out.push_str("</NodeConfiguration>\n");
        out
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("NodeId,DisplayName,BrowseName,DataType,Alias,NamespaceIndex\n");
        for node in &self.selected_nodes {
            let fields = [
                escape_csv(&node.id),
                escape_csv(&node.display_name),
                escape_csv(&node.browse_name),
                escape_csv(&node.data_type),
                escape_csv(node.alias.as_deref().unwrap_or("")),
                node.namespace_index.to_string(),
            ];
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => self.to_json(),
            ExportFormat::Xml => Ok(self.to_xml()),
            ExportFormat::Csv => Ok(self.to_csv()),
        }
    }
}

fn push_element(out: &mut String, depth: usize, tag: &str, value: &str) {
    for _ in 0..depth {
        out.push_str("    ");
    }
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&escape_xml(value));
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Xml,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Xml => "application/xml",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(CoreError::Config(format!("Unknown export format: {}", other))),
        }
    }
}

/// `NodeConfig_YYYYMMDD_HHMMSS.<ext>` for the given moment
pub fn export_file_name<Tz>(format: ExportFormat, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "NodeConfig_{}.{}",
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}
