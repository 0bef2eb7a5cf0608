use std::path::PathBuf;

use bindle_utils::indexmap::FxIndexMap;
use serde::Deserialize;

/// Raw `devServer` config block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevServerOptions {
  pub port: Option<u16>,
  pub open: Option<bool>,
  /// Path prefix -> backend origin, e.g. `"/api": "http://localhost:5000"`.
  pub proxy: Option<FxIndexMap<String, String>>,
  pub history_fallback: Option<bool>,
  /// Directory of literal static files (served as-is, never fallback).
  pub static_dir: Option<PathBuf>,
}

/// Validated dev-server options with defaults applied.
#[derive(Debug, Clone)]
pub struct NormalizedDevServerOptions {
  pub port: u16,
  pub open: bool,
  /// Longest prefix first, so prefix matching is a linear scan.
  pub proxy: Vec<(String, String)>,
  pub history_fallback: bool,
  pub static_dir: Option<PathBuf>,
}
