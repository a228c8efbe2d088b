//! TOML parser with helpful error messages

use super::schema::SyncManifest;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a manifest file with detailed error messages
pub fn parse_manifest(path: &Path) -> Result<SyncManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    parse_manifest_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

/// Parse manifest content from string
pub fn parse_manifest_str(content: &str) -> Result<SyncManifest> {
    let manifest: SyncManifest =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    manifest.validate()?;

    Ok(manifest)
}

/// Enhance TOML parsing errors with the offending lines
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();
    let line_num = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    if let Some(line_num) = line_num {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            message
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", message)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a manifest to TOML string
pub fn to_toml(manifest: &SyncManifest) -> Result<String> {
    toml::to_string_pretty(manifest).context("Failed to serialize manifest")
}
