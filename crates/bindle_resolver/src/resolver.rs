use std::path::{Path, PathBuf};

use dashmap::DashMap;
use sugar_path::SugarPath;

use bindle_common::{AliasItem, ModuleId, NormalizedBundlerOptions, ResolvedId};
use bindle_error::BundleError;
use bindle_fs::{FileSystem, OsFileSystem};

use crate::alias::match_alias;

#[inline]
fn is_http_url(s: &str) -> bool {
  s.starts_with("http://") || s.starts_with("https://") || s.starts_with("//")
}

#[inline]
fn is_data_url(s: &str) -> bool {
  s.trim_start().starts_with("data:")
}

/// Maps `(specifier, importer directory)` to a [`ModuleId`]. Resolution is
/// deterministic and order-sensitive: aliases first (longest prefix), then
/// exact file, then each configured extension, then the directory-index
/// convention. First existing candidate wins.
#[derive(Debug)]
pub struct Resolver<F: FileSystem + Default = OsFileSystem> {
  cwd: PathBuf,
  aliases: Vec<AliasItem>,
  extensions: Vec<String>,
  module_root: String,
  fs: F,
  cache: DashMap<(PathBuf, String), ResolvedId>,
}

impl<F: FileSystem + Default> Resolver<F> {
  pub fn new(options: &NormalizedBundlerOptions, fs: F) -> Self {
    Self {
      cwd: options.cwd.clone(),
      aliases: options.aliases.clone(),
      extensions: options.extensions.clone(),
      module_root: options.module_root.clone(),
      fs,
      cache: DashMap::default(),
    }
  }

  /// Drop every cached resolution. The dev server calls this on watch
  /// events, since file creation/removal can change probe outcomes.
  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  pub fn resolve(
    &self,
    specifier: &str,
    importer: Option<&Path>,
    is_user_defined_entry: bool,
  ) -> Result<ResolvedId, BundleError> {
    // Http and data urls never enter the graph.
    if is_http_url(specifier) || is_data_url(specifier) {
      return Ok(ResolvedId::external(ModuleId::new(specifier)));
    }

    let from_dir = importer
      .and_then(Path::parent)
      .filter(|dir| dir.components().next().is_some())
      .unwrap_or(self.cwd.as_path())
      .to_path_buf();

    let cache_key = (from_dir.clone(), specifier.to_string());
    if let Some(hit) = self.cache.get(&cache_key) {
      return Ok(hit.clone());
    }

    let resolved = self.resolve_uncached(specifier, &from_dir, is_user_defined_entry)?;
    self.cache.insert(cache_key, resolved.clone());
    Ok(resolved)
  }

  fn resolve_uncached(
    &self,
    specifier: &str,
    from_dir: &Path,
    is_user_defined_entry: bool,
  ) -> Result<ResolvedId, BundleError> {
    let (bare, query) = split_query(specifier);

    let not_found = || BundleError::Resolve {
      specifier: specifier.to_string(),
      importers: Vec::new(),
    };

    if let Some(substituted) = match_alias(&self.aliases, bare)? {
      let id = self.probe(&substituted, query).ok_or_else(not_found)?;
      return Ok(ResolvedId::normal(id));
    }

    if bare.starts_with('.') {
      let id = self.probe(&from_dir.join(bare), query).ok_or_else(not_found)?;
      return Ok(ResolvedId::normal(id));
    }

    if Path::new(bare).is_absolute() {
      let id = self.probe(Path::new(bare), query).ok_or_else(not_found)?;
      return Ok(ResolvedId::normal(id));
    }

    // Bare specifier: search upward through the module-root hierarchy.
    for dir in from_dir.ancestors() {
      let candidate = dir.join(&self.module_root).join(bare);
      if let Some(id) = self.probe(&candidate, query) {
        return Ok(ResolvedId::normal(id));
      }
    }

    // `{ entries: { main: "index" } }` is allowed to mean `<cwd>/index.*`.
    if is_user_defined_entry {
      if let Some(id) = self.probe(&self.cwd.join(bare), query) {
        return Ok(ResolvedId::normal(id));
      }
    }

    Err(not_found())
  }

  /// Probe one candidate base path: exact file, each extension appended,
  /// then `<base>/index.<ext>`.
  fn probe(&self, base: &Path, query: Option<&str>) -> Option<ModuleId> {
    let base = base.normalize();

    if self.fs.is_file(&base) {
      return Some(self.module_id(&base, query));
    }

    let base_str = base.to_string_lossy();
    for extension in &self.extensions {
      let candidate = PathBuf::from(format!("{base_str}{extension}"));
      if self.fs.is_file(&candidate) {
        return Some(self.module_id(&candidate, query));
      }
    }

    if self.fs.is_dir(&base) {
      for extension in &self.extensions {
        let candidate = base.join(format!("index{extension}"));
        if self.fs.is_file(&candidate) {
          return Some(self.module_id(&candidate, query));
        }
      }
    }

    None
  }

  fn module_id(&self, path: &Path, query: Option<&str>) -> ModuleId {
    ModuleId::from_parts(&path.to_string_lossy(), query)
  }
}

/// `./logo.svg?raw` -> (`./logo.svg`, `raw`).
fn split_query(specifier: &str) -> (&str, Option<&str>) {
  match specifier.split_once('?') {
    Some((bare, query)) => (bare, Some(query)),
    None => (specifier, None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bindle_common::{InputItem, Mode, NormalizedDevServerOptions};
  use bindle_fs::MemoryFileSystem;

  fn options_with(aliases: Vec<AliasItem>) -> NormalizedBundlerOptions {
    NormalizedBundlerOptions {
      entries: vec![InputItem::new("main", "./index.jsx")],
      cwd: PathBuf::from("/project"),
      out_dir: PathBuf::from("/project/dist"),
      public_path: "/".to_string(),
      aliases,
      mode: Mode::Development,
      extensions: vec![".js".to_string(), ".jsx".to_string()],
      module_root: "node_modules".to_string(),
      loaders: Vec::new(),
      minify: false,
      entry_filenames: "[name].js".to_string(),
      chunk_filenames: "[hash].js".to_string(),
      copy_files: Vec::new(),
      define: bindle_utils::indexmap::FxIndexMap::default(),
      asset_inline_limit: 8192,
      transform_timeout: std::time::Duration::from_secs(10),
      dev_server: NormalizedDevServerOptions {
        port: 8080,
        open: false,
        proxy: Vec::new(),
        history_fallback: true,
        static_dir: None,
      },
    }
  }

  fn resolver(aliases: Vec<AliasItem>, files: &[&str]) -> Resolver<MemoryFileSystem> {
    let fs = MemoryFileSystem::new(files.iter().map(|path| (*path, "")));
    Resolver::new(&options_with(aliases), fs)
  }

  #[test]
  fn alias_with_extension_search() {
    let resolver = resolver(
      vec![AliasItem::new("components", "/project/src/components")],
      &["/project/src/components/Button.jsx"],
    );

    let resolved = resolver
      .resolve("components/Button", Some(Path::new("/project/index.jsx")), false)
      .unwrap();
    assert_eq!(resolved.id.path_str(), "/project/src/components/Button.jsx");

    let missing =
      resolver.resolve("components/Missing", Some(Path::new("/project/index.jsx")), false);
    assert!(matches!(missing.unwrap_err(), BundleError::Resolve { .. }));
  }

  #[test]
  fn extension_order_is_deterministic() {
    let resolver =
      resolver(Vec::new(), &["/project/src/util.js", "/project/src/util.jsx"]);

    // `.js` is configured before `.jsx`, so it must win every time.
    for _ in 0..3 {
      let resolved =
        resolver.resolve("./util", Some(Path::new("/project/src/app.jsx")), false).unwrap();
      assert_eq!(resolved.id.path_str(), "/project/src/util.js");
    }
  }

  #[test]
  fn directory_index_convention() {
    let resolver = resolver(Vec::new(), &["/project/src/widgets/index.js"]);
    let resolved =
      resolver.resolve("./widgets", Some(Path::new("/project/src/app.jsx")), false).unwrap();
    assert_eq!(resolved.id.path_str(), "/project/src/widgets/index.js");
  }

  #[test]
  fn bare_specifier_walks_module_roots() {
    let resolver = resolver(
      Vec::new(),
      &["/project/node_modules/leftpad/index.js"],
    );
    let resolved = resolver
      .resolve("leftpad", Some(Path::new("/project/src/deep/nested/app.js")), false)
      .unwrap();
    assert_eq!(resolved.id.path_str(), "/project/node_modules/leftpad/index.js");
  }

  #[test]
  fn query_is_preserved() {
    let resolver = resolver(Vec::new(), &["/project/src/logo.svg"]);
    let resolved =
      resolver.resolve("./logo.svg?raw", Some(Path::new("/project/src/app.jsx")), false).unwrap();
    assert_eq!(resolved.id.as_ref(), "/project/src/logo.svg?raw");
    assert_eq!(resolved.id.query(), Some("raw"));
  }

  #[test]
  fn http_and_data_urls_are_external() {
    let resolver = resolver(Vec::new(), &[]);
    assert!(resolver.resolve("https://cdn.example/x.js", None, false).unwrap().is_external);
    assert!(resolver.resolve("data:text/plain,hi", None, false).unwrap().is_external);
  }
}
