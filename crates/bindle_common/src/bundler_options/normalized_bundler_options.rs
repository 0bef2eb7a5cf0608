use std::{path::PathBuf, time::Duration};

use bindle_utils::indexmap::FxIndexMap;

use crate::{AliasItem, CopyItem, InputItem, LoaderRule, Mode, NormalizedDevServerOptions};

/// The immutable configuration every component is constructed with. Built
/// once per build invocation by `normalize_options`, validated, then shared
/// behind an `Arc` — never a mutable singleton, so concurrent builds (and
/// tests) cannot interfere.
#[derive(Debug)]
pub struct NormalizedBundlerOptions {
  pub entries: Vec<InputItem>,
  pub cwd: PathBuf,
  pub out_dir: PathBuf,
  /// Prefix for asset urls rewritten into module output, `/` by default.
  pub public_path: String,
  pub aliases: Vec<AliasItem>,
  pub mode: Mode,
  /// Probe order for extension-less specifiers, with leading dots.
  pub extensions: Vec<String>,
  /// Directory name searched upward for bare specifiers.
  pub module_root: String,
  pub loaders: Vec<LoaderRule>,
  pub minify: bool,
  pub entry_filenames: String,
  pub chunk_filenames: String,
  pub copy_files: Vec<CopyItem>,
  /// `process.env.*` substitutions handed to the ecmascript stage.
  pub define: FxIndexMap<String, String>,
  /// Assets at or under this size become data urls.
  pub asset_inline_limit: u64,
  /// Upper bound for a single loader-stage invocation.
  pub transform_timeout: Duration,
  pub dev_server: NormalizedDevServerOptions,
}

impl NormalizedBundlerOptions {
  pub fn is_production(&self) -> bool {
    self.mode.is_production()
  }
}
