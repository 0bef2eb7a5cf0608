use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use bindle_common::{CopyItem, OutputAsset};
use bindle_error::BundleError;
use bindle_fs::FileSystem;
use bindle_utils::xxhash::xxhash_base16;

/// What one emit pass wrote and removed, for logging and tests.
#[derive(Debug, Default)]
pub struct EmitReport {
  pub written: Vec<PathBuf>,
  pub removed_stale: Vec<PathBuf>,
}

/// Writes every artifact under `out_dir`. Each file lands via a temp name
/// plus rename, so a failed attempt never leaves a corrupt artifact at a
/// final name. Stale files from a previous build are removed only after
/// every new write has landed; an interrupted emit can leave extra files
/// behind, never a gap.
pub fn emit<F: FileSystem>(
  fs: &F,
  assets: &[OutputAsset],
  out_dir: &Path,
  copy_files: &[CopyItem],
) -> Result<EmitReport, BundleError> {
  fs.create_dir_all(out_dir).map_err(|err| BundleError::io(out_dir.to_path_buf(), err))?;

  let mut report = EmitReport::default();
  let mut current: FxHashSet<String> = FxHashSet::default();

  for asset in assets {
    let final_path = out_dir.join(&asset.filename);
    write_atomic(fs, &final_path, &asset.content)?;
    current.insert(asset.filename.clone());
    report.written.push(final_path);
  }

  for item in copy_files {
    let content =
      fs.read(&item.from).map_err(|err| BundleError::io(item.from.clone(), err))?;
    let target = out_dir.join(&item.to);
    if let Some(parent) = target.parent() {
      fs.create_dir_all(parent).map_err(|err| BundleError::io(parent.to_path_buf(), err))?;
    }
    write_atomic(fs, &target, &content)?;
    if let Some(name) = item.to.to_str() {
      current.insert(name.to_string());
    }
    report.written.push(target);
  }

  // Cleanup pass, strictly after all writes.
  let names =
    fs.read_dir(out_dir).map_err(|err| BundleError::io(out_dir.to_path_buf(), err))?;
  for name in names {
    if current.contains(&name) || fs.is_dir(&out_dir.join(&name)) {
      continue;
    }
    let stale = out_dir.join(&name);
    fs.remove_file(&stale).map_err(|err| BundleError::io(stale.clone(), err))?;
    report.removed_stale.push(stale);
  }

  Ok(report)
}

fn write_atomic<F: FileSystem>(
  fs: &F,
  final_path: &Path,
  content: &[u8],
) -> Result<(), BundleError> {
  let nonce = xxhash_base16(final_path.as_os_str().as_encoded_bytes(), 8);
  let tmp_path = final_path.with_extension(format!("tmp-{nonce}"));
  fs.write(&tmp_path, content).map_err(|err| BundleError::io(tmp_path.clone(), err))?;
  fs.rename(&tmp_path, final_path)
    .map_err(|err| BundleError::io(final_path.to_path_buf(), err))
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use bindle_common::{ArtifactKind, OutputAsset};
  use bindle_fs::{FileSystem, MemoryFileSystem};

  use super::emit;

  fn chunk(filename: &str, content: &str) -> OutputAsset {
    OutputAsset {
      filename: filename.to_string(),
      content: content.as_bytes().to_vec(),
      kind: ArtifactKind::Chunk { name: arcstr::ArcStr::from(filename) },
    }
  }

  #[test]
  fn writes_artifacts_and_reports_them() {
    let fs = MemoryFileSystem::default();
    let out = Path::new("/dist");
    let report = emit(&fs, &[chunk("main.js", "let a = 1;")], out, &[]).unwrap();

    assert_eq!(report.written.len(), 1);
    assert_eq!(fs.read_to_string(Path::new("/dist/main.js")).unwrap(), "let a = 1;");
    // No temp files are left behind.
    assert_eq!(fs.read_dir(out).unwrap(), vec!["main.js".to_string()]);
  }

  #[test]
  fn stale_artifacts_are_removed_after_writes() {
    let fs = MemoryFileSystem::default();
    let out = Path::new("/dist");
    emit(&fs, &[chunk("old-hash.js", "x")], out, &[]).unwrap();
    let report = emit(&fs, &[chunk("new-hash.js", "y")], out, &[]).unwrap();

    assert_eq!(report.removed_stale, vec![out.join("old-hash.js")]);
    assert!(!fs.is_file(Path::new("/dist/old-hash.js")));
    assert!(fs.is_file(Path::new("/dist/new-hash.js")));
  }

  #[test]
  fn unchanged_artifact_survives_rebuild() {
    let fs = MemoryFileSystem::default();
    let out = Path::new("/dist");
    emit(&fs, &[chunk("main.js", "x"), chunk("vendor.js", "v")], out, &[]).unwrap();
    let report = emit(&fs, &[chunk("main.js", "x2"), chunk("vendor.js", "v")], out, &[]).unwrap();

    assert!(report.removed_stale.is_empty());
    assert_eq!(fs.read_to_string(Path::new("/dist/main.js")).unwrap(), "x2");
  }

  #[test]
  fn copy_files_land_in_the_output_dir() {
    let fs = MemoryFileSystem::default();
    fs.write(Path::new("/src/favicon.ico"), b"icon").unwrap();
    let out = Path::new("/dist");
    let copy = vec![bindle_common::CopyItem {
      from: "/src/favicon.ico".into(),
      to: "favicon.ico".into(),
    }];
    emit(&fs, &[], out, &copy).unwrap();

    assert_eq!(fs.read(Path::new("/dist/favicon.ico")).unwrap(), b"icon".to_vec());
  }
}
