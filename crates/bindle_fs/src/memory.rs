use std::{
  collections::BTreeMap,
  io,
  path::{Path, PathBuf},
  sync::Mutex,
};

use sugar_path::SugarPath;

#[derive(Debug, Clone)]
struct FileEntry {
  data: Vec<u8>,
  mtime_ms: u64,
}

/// In-memory filesystem for tests. Directories exist implicitly: a path is a
/// directory iff some stored file lives beneath it.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
  files: Mutex<BTreeMap<PathBuf, FileEntry>>,
  clock: Mutex<u64>,
}

impl MemoryFileSystem {
  pub fn new(files: impl IntoIterator<Item = (impl AsRef<Path>, impl AsRef<[u8]>)>) -> Self {
    let fs = Self::default();
    for (path, content) in files {
      fs.add_file(path.as_ref(), content.as_ref());
    }
    fs
  }

  pub fn add_file(&self, path: &Path, content: &[u8]) {
    let mtime_ms = self.tick();
    self
      .files
      .lock()
      .unwrap()
      .insert(path.normalize(), FileEntry { data: content.to_vec(), mtime_ms });
  }

  fn tick(&self) -> u64 {
    let mut clock = self.clock.lock().unwrap();
    *clock += 1;
    *clock
  }

  fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
  }
}

impl crate::FileSystem for MemoryFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    let files = self.files.lock().unwrap();
    files.get(&path.normalize()).map(|entry| entry.data.clone()).ok_or_else(|| Self::not_found(path))
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    String::from_utf8(self.read(path)?)
      .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
  }

  fn is_file(&self, path: &Path) -> bool {
    self.files.lock().unwrap().contains_key(&path.normalize())
  }

  fn is_dir(&self, path: &Path) -> bool {
    let prefix = path.normalize();
    self.files.lock().unwrap().keys().any(|stored| stored != &prefix && stored.starts_with(&prefix))
  }

  fn mtime_ms(&self, path: &Path) -> io::Result<u64> {
    let files = self.files.lock().unwrap();
    files.get(&path.normalize()).map(|entry| entry.mtime_ms).ok_or_else(|| Self::not_found(path))
  }

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    self.add_file(path, content);
    Ok(())
  }

  fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
    Ok(())
  }

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
    let mut files = self.files.lock().unwrap();
    let entry = files.remove(&from.normalize()).ok_or_else(|| Self::not_found(from))?;
    files.insert(to.normalize(), entry);
    Ok(())
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    let mut files = self.files.lock().unwrap();
    files.remove(&path.normalize()).map(|_| ()).ok_or_else(|| Self::not_found(path))
  }

  fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
    let prefix = path.normalize();
    let files = self.files.lock().unwrap();
    let mut names: Vec<String> = files
      .keys()
      .filter_map(|stored| stored.strip_prefix(&prefix).ok())
      .filter_map(|rest| rest.components().next())
      .map(|component| component.as_os_str().to_string_lossy().into_owned())
      .collect();
    names.sort_unstable();
    names.dedup();
    Ok(names)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::FileSystem;

  #[test]
  fn implicit_directories() {
    let fs = MemoryFileSystem::new([("/src/components/Button.jsx", "export {}")]);
    assert!(fs.is_file(Path::new("/src/components/Button.jsx")));
    assert!(fs.is_dir(Path::new("/src/components")));
    assert!(fs.is_dir(Path::new("/src")));
    assert!(!fs.is_dir(Path::new("/dist")));
  }

  #[test]
  fn mtime_advances_on_write() {
    let fs = MemoryFileSystem::default();
    let path = Path::new("/a.js");
    fs.write(path, b"1").unwrap();
    let first = fs.mtime_ms(path).unwrap();
    fs.write(path, b"2").unwrap();
    assert!(fs.mtime_ms(path).unwrap() > first);
  }
}
