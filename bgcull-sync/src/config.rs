//! Configuration resolution for bgcull-sync
//!
//! Provides multi-tier resolution for the catalog session token:
//! CLI / environment → TOML.

use bgcull_common::config::TomlConfig;
use tracing::{info, warn};

/// Environment variable carrying the catalog session token
pub const CATALOG_TOKEN_ENV: &str = "BGCULL_CATALOG_TOKEN";

/// Resolve the catalog session token
///
/// **Priority:** CLI argument or environment (clap merges the two) → TOML.
/// Blank values are ignored. No token is not an error: the catalog may still
/// serve the request, and expansion sync can fall back to name matching.
pub fn resolve_catalog_token(cli_or_env: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    let toml_token = toml_config.catalog.auth_token.as_deref();

    let sources: Vec<&str> = [("command line/environment", cli_or_env), ("TOML", toml_token)]
        .iter()
        .filter(|(_, value)| value.is_some_and(is_valid_token))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "Catalog token found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(token) = cli_or_env.filter(|t| is_valid_token(t)) {
        info!("Catalog token loaded from command line/environment");
        return Some(token.trim().to_string());
    }

    if let Some(token) = toml_token.filter(|t| is_valid_token(t)) {
        info!("Catalog token loaded from TOML config");
        return Some(token.trim().to_string());
    }

    warn!(
        "No catalog token configured (set {} or [catalog] auth_token); \
         the catalog may deny lookups",
        CATALOG_TOKEN_ENV
    );
    None
}

/// Token is usable if non-empty after trimming
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
