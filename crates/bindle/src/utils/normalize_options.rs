use std::{path::Path, time::Duration};

use sugar_path::SugarPath;

use bindle_common::{
  AliasItem, BundlerOptions, CopyItem, InputItem, LoaderRule, Mode, NormalizedBundlerOptions,
  NormalizedDevServerOptions,
};
use bindle_error::{BuildResult, BundleError};
use bindle_utils::indexmap::FxIndexMap;

const DEFAULT_ENTRY: (&str, &str) = ("main", "./index.jsx");
const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".jsx"];
const DEFAULT_ASSET_INLINE_LIMIT: u64 = 8192;
const DEFAULT_TRANSFORM_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_DEV_PORT: u16 = 8080;

/// Turn the raw user configuration into the immutable, validated options
/// object every component is constructed with. All defaults live here;
/// validation failures are `ConfigError`s raised before any graph work.
pub fn normalize_options(raw: BundlerOptions) -> BuildResult<NormalizedBundlerOptions> {
  let cwd = match raw.cwd {
    Some(cwd) => cwd,
    None => std::env::current_dir()
      .map_err(|err| BundleError::Config(format!("cannot determine cwd: {err}")))?,
  };

  let entries = match raw.entries {
    Some(map) if map.is_empty() => {
      return Err(BundleError::Config("`entries` must not be empty".to_string()).into());
    }
    Some(map) => {
      map.into_iter().map(|(name, import)| InputItem::new(name, import)).collect::<Vec<_>>()
    }
    None => vec![InputItem::new(DEFAULT_ENTRY.0, DEFAULT_ENTRY.1)],
  };

  let mode = raw.mode.unwrap_or_default();

  let aliases = raw
    .aliases
    .unwrap_or_default()
    .into_iter()
    .map(|(find, replacement)| {
      if find.is_empty() {
        return Err(BundleError::Config("alias prefix must not be empty".to_string()));
      }
      Ok(AliasItem::new(find, Path::new(&replacement).absolutize_with(&cwd)))
    })
    .collect::<Result<Vec<_>, _>>()?;

  let extensions = raw
    .extensions
    .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect())
    .into_iter()
    .map(|ext| if ext.starts_with('.') { ext } else { format!(".{ext}") })
    .collect::<Vec<_>>();

  let loaders = match raw.loaders {
    Some(loaders) => {
      for rule in &loaders {
        if rule.stage_chain.is_empty() {
          return Err(
            BundleError::Config(format!("loader rule '{}' has an empty stage chain", rule.pattern))
              .into(),
          );
        }
      }
      loaders
    }
    None => default_loaders(),
  };

  let dev = raw.dev_server.unwrap_or_default();
  let mut proxy = dev.proxy.unwrap_or_default().into_iter().collect::<Vec<_>>();
  for (prefix, origin) in &proxy {
    if !prefix.starts_with('/') {
      return Err(
        BundleError::Config(format!("proxy prefix '{prefix}' must start with '/'")).into(),
      );
    }
    if !origin.starts_with("http://") && !origin.starts_with("https://") {
      return Err(
        BundleError::Config(format!("proxy origin '{origin}' must be an http(s) url")).into(),
      );
    }
  }
  // Longest prefix first so request matching is a simple linear scan.
  proxy.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

  let define = match &raw.env_file {
    Some(env_file) => load_env_file(&env_file.absolutize_with(&cwd))?,
    None => FxIndexMap::default(),
  };

  let public_path = raw.public_path.unwrap_or_else(|| "/".to_string());
  if !public_path.ends_with('/') {
    return Err(BundleError::Config("`publicPath` must end with '/'".to_string()).into());
  }

  Ok(NormalizedBundlerOptions {
    out_dir: raw.output_dir.unwrap_or_else(|| "dist".into()).absolutize_with(&cwd),
    public_path,
    entries,
    aliases,
    mode,
    extensions,
    module_root: raw.module_root.unwrap_or_else(|| "node_modules".to_string()),
    loaders,
    minify: raw.minify.unwrap_or_else(|| mode.is_production()),
    entry_filenames: raw.entry_filenames.unwrap_or_else(|| match mode {
      Mode::Development => "[name].js".to_string(),
      Mode::Production => "[hash].js".to_string(),
    }),
    chunk_filenames: raw.chunk_filenames.unwrap_or_else(|| "[hash].js".to_string()),
    copy_files: raw
      .copy_files
      .unwrap_or_default()
      .into_iter()
      .map(|item| CopyItem { from: item.from.absolutize_with(&cwd), to: item.to })
      .collect(),
    define,
    asset_inline_limit: raw.asset_inline_limit.unwrap_or(DEFAULT_ASSET_INLINE_LIMIT),
    transform_timeout: Duration::from_millis(
      raw.transform_timeout_ms.unwrap_or(DEFAULT_TRANSFORM_TIMEOUT_MS),
    ),
    dev_server: NormalizedDevServerOptions {
      port: dev.port.unwrap_or(DEFAULT_DEV_PORT),
      open: dev.open.unwrap_or(false),
      proxy,
      history_fallback: dev.history_fallback.unwrap_or(false),
      static_dir: dev.static_dir.map(|dir| dir.absolutize_with(&cwd)),
    },
    cwd,
  })
}

/// The stock loader table when the config declares none: scripts, styles,
/// and the asset extensions of the classic file-loader rules.
fn default_loaders() -> Vec<LoaderRule> {
  vec![
    LoaderRule::new("*.{js,jsx,mjs,cjs}", vec!["ecmascript".to_string()]),
    LoaderRule::new("*.css", vec!["css".to_string()]),
    LoaderRule::new(
      "*.{png,jpg,jpeg,svg,gif,webp,ico,ttf,woff,woff2,eot}",
      vec!["asset".to_string()],
    ),
  ]
}

/// KEY=VALUE pairs, `#` comments and blank lines ignored. Values are used
/// verbatim as `process.env.KEY` substitutions.
fn load_env_file(path: &Path) -> BuildResult<FxIndexMap<String, String>> {
  let content = std::fs::read_to_string(path)
    .map_err(|err| BundleError::Config(format!("cannot read envFile {}: {err}", path.display())))?;

  let mut define = FxIndexMap::default();
  for line in content.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let Some((key, value)) = line.split_once('=') else {
      return Err(BundleError::Config(format!("malformed envFile line: '{line}'")).into());
    };
    define.insert(key.trim().to_string(), value.trim().to_string());
  }
  Ok(define)
}
