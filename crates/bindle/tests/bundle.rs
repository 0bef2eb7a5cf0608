use std::{fs, path::Path};

use serde_json::json;
use tempfile::TempDir;

use bindle::{Bundler, BundlerOptions};

fn write(dir: &Path, rel: &str, content: &str) {
  let path = dir.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

fn options(dir: &TempDir, extra: serde_json::Value) -> BundlerOptions {
  let mut value = json!({
    "cwd": dir.path(),
    "outputDir": dir.path().join("dist"),
  });
  value.as_object_mut().unwrap().extend(extra.as_object().unwrap().clone());
  serde_json::from_value(value).unwrap()
}

fn chunk_content<'a>(output: &'a bindle::BundleOutput, filename: &str) -> &'a str {
  let asset = output
    .assets
    .iter()
    .find(|asset| asset.filename == filename)
    .unwrap_or_else(|| panic!("no asset named {filename}"));
  std::str::from_utf8(&asset.content).unwrap()
}

#[tokio::test]
async fn builds_the_default_entry_with_aliases_and_extensions() {
  let dir = TempDir::new().unwrap();
  // Mirrors a typical react-ish tree: jsx entry, aliased component dir.
  write(dir.path(), "index.jsx", "import App from 'components/App';\nrender(App);\n");
  write(
    dir.path(),
    "src/components/App/index.jsx",
    "import { helper } from './helper';\nexport default helper;\n",
  );
  write(dir.path(), "src/components/App/helper.js", "export const helper = 1;\n");

  let mut bundler = Bundler::new(options(
    &dir,
    json!({ "aliases": { "components": "./src/components" } }),
  ))
  .unwrap();
  let output = bundler.build().await.unwrap();

  let main = chunk_content(&output, "main.js");
  assert!(main.contains("helper.js"));
  assert!(main.contains("index.jsx"));
  // Dependencies come before their importers.
  let helper_at = main.find("export const helper").unwrap();
  let entry_at = main.find("render(App)").unwrap();
  assert!(helper_at < entry_at);
  assert_eq!(output.manifest.get("main"), Some("/main.js"));
}

#[tokio::test]
async fn building_twice_is_byte_identical() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "import './a.js';\nimport './b.js';\nstart();\n");
  write(dir.path(), "a.js", "export const a = 'a';\n");
  write(dir.path(), "b.js", "export const b = 'b';\n");

  let opts = options(&dir, json!({ "mode": "production" }));
  let first = Bundler::new(opts.clone()).unwrap().build().await.unwrap();
  let second = Bundler::new(opts).unwrap().build().await.unwrap();

  let names = |output: &bindle::BundleOutput| {
    output.assets.iter().map(|a| a.filename.clone()).collect::<Vec<_>>()
  };
  assert_eq!(names(&first), names(&second));
  for (left, right) in first.assets.iter().zip(&second.assets) {
    assert_eq!(left.content, right.content, "{} differs across builds", left.filename);
  }
}

#[tokio::test]
async fn shared_module_is_hoisted_into_a_common_chunk() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "one.js", "import { shared } from './shared.js';\nuse(shared);\n");
  write(dir.path(), "two.js", "import { shared } from './shared.js';\nuse(shared);\n");
  write(dir.path(), "shared.js", "export const shared = 42;\n");

  let mut bundler = Bundler::new(options(
    &dir,
    json!({ "entries": { "one": "./one.js", "two": "./two.js" } }),
  ))
  .unwrap();
  let output = bundler.build().await.unwrap();

  let chunks: Vec<&bindle::OutputAsset> =
    output.assets.iter().filter(|asset| asset.is_chunk()).collect();
  assert_eq!(chunks.len(), 3);
  // The shared module appears in exactly one chunk, and not in an entry.
  let holding: Vec<&str> = chunks
    .iter()
    .filter(|asset| std::str::from_utf8(&asset.content).unwrap().contains("shared = 42"))
    .map(|asset| asset.filename.as_str())
    .collect();
  assert_eq!(holding.len(), 1);
  assert_ne!(holding[0], "one.js");
  assert_ne!(holding[0], "two.js");
}

#[tokio::test]
async fn dynamic_import_produces_a_lazy_chunk() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "const p = import('./panel.js');\nboot(p);\n");
  write(dir.path(), "panel.js", "export const panel = 'panel';\n");

  let mut bundler = Bundler::new(options(&dir, json!({}))).unwrap();
  let output = bundler.build().await.unwrap();

  let chunks: Vec<&bindle::OutputAsset> =
    output.assets.iter().filter(|asset| asset.is_chunk()).collect();
  assert_eq!(chunks.len(), 2);
  let main = chunk_content(&output, "main.js");
  assert!(!main.contains("panel'"), "lazy module must not land in the entry chunk");
}

#[tokio::test]
async fn incremental_rebuild_matches_a_cold_build() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "import { leaf } from './leaf.js';\nuse(leaf);\n");
  write(dir.path(), "leaf.js", "export const leaf = 1;\n");

  let opts = options(&dir, json!({}));
  let mut bundler = Bundler::new(opts.clone()).unwrap();
  bundler.build().await.unwrap();

  write(dir.path(), "leaf.js", "export const leaf = 2;\n");
  let summary = bundler.rebuild(vec![dir.path().join("leaf.js")]).await.unwrap();

  assert!(!summary.full_reload);
  assert_eq!(summary.changed_modules, vec!["leaf.js".to_string()]);
  assert_eq!(summary.updates.len(), 1);
  assert_eq!(summary.updates[0].chunk, "main");
  assert_eq!(summary.updates[0].modules, vec!["leaf.js".to_string()]);

  let cold = Bundler::new(opts).unwrap().build().await.unwrap();
  for (incremental, fresh) in summary.output.assets.iter().zip(&cold.assets) {
    assert_eq!(incremental.filename, fresh.filename);
    assert_eq!(incremental.content, fresh.content);
  }
}

#[tokio::test]
async fn rebuild_picks_up_new_dependencies_and_prunes_orphans() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "import { a } from './a.js';\nuse(a);\n");
  write(dir.path(), "a.js", "export const a = 1;\n");

  let mut bundler = Bundler::new(options(&dir, json!({}))).unwrap();
  bundler.build().await.unwrap();

  // Swap the dependency: a.js out, b.js in.
  write(dir.path(), "b.js", "export const b = 2;\n");
  write(dir.path(), "index.jsx", "import { b } from './b.js';\nuse(b);\n");
  let summary = bundler.rebuild(vec![dir.path().join("index.jsx")]).await.unwrap();

  let main = chunk_content(&summary.output, "main.js");
  assert!(main.contains("b = 2"));
  assert!(!main.contains("a = 1"), "orphaned module must be pruned");
}

#[tokio::test]
async fn rebuild_accepts_a_much_larger_graph() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "import { w0 } from './w0.js';\nuse(w0);\n");
  write(dir.path(), "w0.js", "export const w0 = 0;\n");

  let mut bundler = Bundler::new(options(&dir, json!({}))).unwrap();
  bundler.build().await.unwrap();

  // The entry fans out to thirty new leaves between builds.
  let mut entry = String::new();
  for i in 0..30 {
    entry.push_str(&format!("import {{ w{i} }} from './w{i}.js';\n"));
    write(dir.path(), &format!("w{i}.js"), &format!("export const w{i} = {i};\n"));
  }
  entry.push_str("use(w0);\n");
  write(dir.path(), "index.jsx", &entry);

  let summary = bundler.rebuild(vec![dir.path().join("index.jsx")]).await.unwrap();
  let main = chunk_content(&summary.output, "main.js");
  for i in 0..30 {
    assert!(main.contains(&format!("w{i} = {i}")), "w{i}.js missing from the rebuilt chunk");
  }
}

#[tokio::test]
async fn rebuild_failure_keeps_the_previous_snapshot() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "import { a } from './a.js';\nuse(a);\n");
  write(dir.path(), "a.js", "export const a = 1;\n");

  let mut bundler = Bundler::new(options(&dir, json!({}))).unwrap();
  bundler.build().await.unwrap();

  // Break the entry, then fix it again.
  write(dir.path(), "index.jsx", "import { gone } from './gone.js';\n");
  let err = bundler.rebuild(vec![dir.path().join("index.jsx")]).await.unwrap_err();
  assert!(format!("{err}").contains("./gone.js"));

  write(dir.path(), "index.jsx", "import { a } from './a.js';\nuse(a);\n");
  let summary = bundler.rebuild(vec![dir.path().join("index.jsx")]).await.unwrap();
  assert!(chunk_content(&summary.output, "main.js").contains("a = 1"));
}

#[tokio::test]
async fn unresolved_import_reports_the_importer_chain() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "import './mid.js';\n");
  write(dir.path(), "mid.js", "import './missing.js';\n");

  let mut bundler = Bundler::new(options(&dir, json!({}))).unwrap();
  let err = bundler.build().await.unwrap_err();
  let rendered = format!("{err}");
  assert!(rendered.contains("./missing.js"));
  assert!(rendered.contains("mid.js"));
}

#[tokio::test]
async fn write_emits_artifacts_and_cleans_stale_hashes() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "boot(1);\n");

  let opts = options(&dir, json!({ "mode": "production" }));
  let mut bundler = Bundler::new(opts.clone()).unwrap();
  let (_, report) = bundler.write().await.unwrap();
  let first_chunk = report
    .written
    .iter()
    .find(|path| path.extension().is_some_and(|ext| ext == "js"))
    .unwrap()
    .clone();
  assert!(first_chunk.exists());

  write(dir.path(), "index.jsx", "boot(2);\n");
  let mut bundler = Bundler::new(opts).unwrap();
  let (_, report) = bundler.write().await.unwrap();
  assert!(report.removed_stale.contains(&first_chunk));
  assert!(!first_chunk.exists());
  assert!(dir.path().join("dist/manifest.json").exists());
}

#[tokio::test]
async fn production_filenames_are_content_hashed() {
  let dir = TempDir::new().unwrap();
  write(dir.path(), "index.jsx", "boot();\n");

  let mut bundler =
    Bundler::new(options(&dir, json!({ "mode": "production" }))).unwrap();
  let output = bundler.build().await.unwrap();

  let chunk = output.assets.iter().find(|asset| asset.is_chunk()).unwrap();
  let stem = chunk.filename.strip_suffix(".js").unwrap();
  assert_eq!(stem.len(), 8);
  assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
  assert_eq!(output.manifest.get("main"), Some(format!("/{}", chunk.filename).as_str()));
}
