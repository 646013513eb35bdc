//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use fleet_core::ReassignPolicy;

use crate::errors::Result;
use crate::types::FleetSettings;

/// Resolve the path to the settings file (`~/.fleet/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".fleet").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FleetSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<FleetSettings> {
    let defaults = serde_json::to_value(FleetSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: FleetSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Each var has strict parsing rules: integers must be valid and within the
/// specified range. Invalid values are silently ignored (falling back to
/// file/default values), with a warning in the log.
pub fn apply_env_overrides(settings: &mut FleetSettings) {
    if let Some(v) = read_env_string("FLEET_HOST") {
        settings.gateway.host = v;
    }
    if let Some(v) = read_env_u16("FLEET_PORT") {
        settings.gateway.port = v;
    }
    if let Some(v) = read_env_usize("FLEET_MAX_CONNECTIONS", 1, 100_000) {
        settings.gateway.max_connections = v;
    }
    if let Some(v) = read_env_usize("FLEET_CHANNEL_BUFFER", 1, 65_536) {
        settings.gateway.channel_buffer = v;
    }
    if let Some(v) = read_env_u64("FLEET_HEARTBEAT_INTERVAL_MS", 1_000, 600_000) {
        settings.gateway.heartbeat_interval_ms = v;
    }
    if let Some(v) = read_env_u64("FLEET_HEARTBEAT_TIMEOUT_MS", 1_000, 3_600_000) {
        settings.gateway.heartbeat_timeout_ms = v;
    }
    if let Some(v) = read_env_u64("FLEET_SWEEP_INTERVAL_MS", 1_000, 3_600_000) {
        settings.gateway.sweep_interval_ms = v;
    }
    if let Some(v) = read_env_f64("FLEET_SEARCH_RADIUS_KM", 0.1, 1_000.0) {
        settings.dispatch.default_search_radius_km = v;
    }
    if let Some(v) = std::env::var("FLEET_REASSIGN_POLICY")
        .ok()
        .and_then(|raw| parse_reassign_policy(&raw))
    {
        settings.dispatch.reassign_policy = v;
    }
    if let Some(v) = read_env_u64("FLEET_STORE_TIMEOUT_MS", 100, 60_000) {
        settings.dispatch.store_timeout_ms = v;
    }
}

// ── Pure parsers ─────────────────────────────────────────────────────────────

/// Parse a u64 constrained to `[min, max]`; `None` on any violation.
fn parse_u64_range(raw: &str, min: u64, max: u64) -> Option<u64> {
    let value: u64 = raw.trim().parse().ok()?;
    (min..=max).contains(&value).then_some(value)
}

/// Parse a usize constrained to `[min, max]`; `None` on any violation.
fn parse_usize_range(raw: &str, min: usize, max: usize) -> Option<usize> {
    let value: usize = raw.trim().parse().ok()?;
    (min..=max).contains(&value).then_some(value)
}

/// Parse a finite f64 constrained to `[min, max]`; `None` on any violation.
fn parse_f64_range(raw: &str, min: f64, max: f64) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && (min..=max).contains(&value)).then_some(value)
}

/// Parse a reassignment policy name (`last_writer_wins` | `reject`).
fn parse_reassign_policy(raw: &str) -> Option<ReassignPolicy> {
    serde_json::from_value(Value::String(raw.trim().to_owned())).ok()
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = val.trim().parse().ok();
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

fn read_env_f64(name: &str, min: f64, max: f64) -> Option<f64> {
    let val = std::env::var(name).ok()?;
    let result = parse_f64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid f64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
