//! `megabyzus tools list|show`.

use megabyzus::{ToolRegistry, ToolSpec, Toolset};
use serde_json::json;

use crate::CliError;

/// One line per tool (`name  description`), or a JSON array of `{name, description}`.
pub fn list_tools(toolset: Toolset, as_json: bool) -> Result<String, CliError> {
    let registry = ToolRegistry::for_toolset(toolset)?;
    let specs = registry.specs();
    if as_json {
        let items: Vec<_> = specs
            .iter()
            .map(|s| json!({"name": s.name, "description": s.description}))
            .collect();
        return Ok(serde_json::to_string(&items)?);
    }
    let width = specs.iter().map(|s| s.name.len()).max().unwrap_or(0);
    Ok(specs
        .iter()
        .map(|s| format!("{:<width$}  {}", s.name, first_line(&s.description), width = width))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Full definition of `name` (name, description, input_schema) as pretty JSON.
pub fn show_tool(toolset: Toolset, name: &str) -> Result<String, CliError> {
    let registry = ToolRegistry::for_toolset(toolset)?;
    let spec: &ToolSpec = registry
        .specs()
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| CliError::ToolNotFound(name.to_string()))?;
    Ok(serde_json::to_string_pretty(spec)?)
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}
