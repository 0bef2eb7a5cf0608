use bindle_fs::OsFileSystem;
use tokio::sync::mpsc::Sender;

use crate::types::{SharedOptions, SharedPipeline, SharedResolver};

use super::ModuleLoaderMsg;

/// Everything a module task needs, shared by all tasks of one build.
pub struct TaskContext {
  pub fs: OsFileSystem,
  pub resolver: SharedResolver,
  pub pipeline: SharedPipeline,
  pub options: SharedOptions,
  pub tx: Sender<ModuleLoaderMsg>,
}
