use std::{io, path::Path};

/// The filesystem surface the bundler is allowed to touch. Components never
/// call `std::fs` directly; tests swap in [`crate::MemoryFileSystem`].
pub trait FileSystem: Send + Sync {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn read_to_string(&self, path: &Path) -> io::Result<String>;

  fn is_file(&self, path: &Path) -> bool;

  fn is_dir(&self, path: &Path) -> bool;

  /// Last modification time in milliseconds since the unix epoch.
  fn mtime_ms(&self, path: &Path) -> io::Result<u64>;

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()>;

  fn create_dir_all(&self, path: &Path) -> io::Result<()>;

  /// Atomic within a directory on every platform we target.
  fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

  fn remove_file(&self, path: &Path) -> io::Result<()>;

  /// File names (not full paths) of the direct children of `path`.
  fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;
}
