use std::path::PathBuf;

use serde::Deserialize;

/// A file copied verbatim into the output directory, bypassing the module
/// graph (favicons and the like).
#[derive(Debug, Clone, Deserialize)]
pub struct CopyItem {
  pub from: PathBuf,
  pub to: PathBuf,
}
