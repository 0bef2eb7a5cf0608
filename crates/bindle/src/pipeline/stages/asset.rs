use std::path::Path;

use bindle_common::{EmittedAssetSpec, TransformContext, TransformOutput, TransformStage};
use bindle_utils::{mime_ext::mime_type_of, sanitize_file_name::sanitize_file_name, xxhash};

/// Images and fonts become small script modules exporting a url. The file
/// itself is emitted as a content-addressed asset, unless it is small
/// enough (or asked, via `?inline`) to be inlined as a data url. `?raw`
/// yields the file's text instead.
pub struct AssetStage {
  public_path: String,
  inline_limit: u64,
}

impl AssetStage {
  pub fn new(public_path: String, inline_limit: u64) -> Self {
    Self { public_path, inline_limit }
  }

  fn data_url(path: &Path, bytes: &[u8]) -> String {
    let mime = mime_type_of(path, bytes);
    let encoded = base64_simd::STANDARD.encode_to_string(bytes);
    format!("data:{mime};base64,{encoded}")
  }

  fn hashed_filename(path: &Path, bytes: &[u8]) -> String {
    let stem = path.file_stem().map_or_else(|| "asset".into(), |stem| stem.to_string_lossy());
    let hash = xxhash::xxhash_base16(bytes, 8);
    let extension =
      path.extension().map_or_else(String::new, |ext| format!(".{}", ext.to_string_lossy()));
    sanitize_file_name(&format!("{stem}.{hash}{extension}"))
  }
}

impl TransformStage for AssetStage {
  fn name(&self) -> &'static str {
    "asset"
  }

  fn transform(
    &self,
    ctx: &TransformContext<'_>,
    bytes: Vec<u8>,
  ) -> Result<TransformOutput, String> {
    let path = ctx.id.path();

    let export_of = |value: &str| {
      format!("export default {};\n", serde_json::Value::String(value.to_string()))
    };

    match ctx.id.query() {
      Some("raw") => {
        let text = std::str::from_utf8(&bytes)
          .map_err(|_| "?raw import of a non-utf8 file".to_string())?;
        return Ok(TransformOutput::passthrough(export_of(text).into_bytes()));
      }
      Some("inline") => {
        let output = export_of(&Self::data_url(path, &bytes));
        return Ok(TransformOutput::passthrough(output.into_bytes()));
      }
      _ => {}
    }

    let force_file = ctx.id.query() == Some("url");
    if !force_file && bytes.len() as u64 <= self.inline_limit {
      let output = export_of(&Self::data_url(path, &bytes));
      return Ok(TransformOutput::passthrough(output.into_bytes()));
    }

    let filename = Self::hashed_filename(path, &bytes);
    let output = export_of(&format!("{}{filename}", self.public_path));
    Ok(TransformOutput {
      bytes: output.into_bytes(),
      dependencies: Vec::new(),
      assets: vec![EmittedAssetSpec {
        filename,
        content: bytes,
        source_path: ctx.id.path_str().to_string(),
      }],
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bindle_common::ModuleId;

  fn run(stage: &AssetStage, id: &str, bytes: &[u8]) -> TransformOutput {
    let id = ModuleId::new(id);
    let ctx = TransformContext { id: &id, options: &serde_json::Value::Null };
    stage.transform(&ctx, bytes.to_vec()).unwrap()
  }

  #[test]
  fn small_assets_inline_as_data_urls() {
    let stage = AssetStage::new("/".to_string(), 1024);
    let output = run(&stage, "/project/src/icon.png", b"\x89PNG tiny");
    let text = String::from_utf8(output.bytes).unwrap();
    assert!(text.starts_with("export default \"data:image/png;base64,"));
    assert!(output.assets.is_empty());
  }

  #[test]
  fn large_assets_are_emitted_and_hashed() {
    let stage = AssetStage::new("/".to_string(), 4);
    let output = run(&stage, "/project/src/photo.jpg", b"not actually small");
    assert_eq!(output.assets.len(), 1);
    let asset = &output.assets[0];
    assert!(asset.filename.starts_with("photo."));
    assert!(asset.filename.ends_with(".jpg"));
    let text = String::from_utf8(output.bytes).unwrap();
    assert!(text.contains(&format!("/{}", asset.filename)));
  }

  #[test]
  fn raw_query_exports_text() {
    let stage = AssetStage::new("/".to_string(), 0);
    let output = run(&stage, "/project/src/logo.svg?raw", b"<svg/>");
    assert_eq!(
      String::from_utf8(output.bytes).unwrap(),
      "export default \"<svg/>\";\n"
    );
  }

  #[test]
  fn url_query_forces_a_file() {
    let stage = AssetStage::new("/assets/".to_string(), u64::MAX);
    let output = run(&stage, "/project/src/font.woff2?url", b"woof");
    assert_eq!(output.assets.len(), 1);
    assert!(String::from_utf8(output.bytes).unwrap().contains("/assets/font."));
  }
}
