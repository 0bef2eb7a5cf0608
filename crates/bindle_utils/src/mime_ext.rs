use std::path::Path;

/// Content type for an emitted artifact or inlined asset. Extension first,
/// magic bytes as a fallback for extension-less assets.
pub fn mime_type_of(path: &Path, content: &[u8]) -> String {
  let by_extension = path.extension().and_then(|ext| ext.to_str()).and_then(|ext| {
    Some(match ext.to_ascii_lowercase().as_str() {
      "js" | "mjs" | "cjs" | "jsx" => mime::APPLICATION_JAVASCRIPT_UTF_8.to_string(),
      "css" | "scss" | "sass" => mime::TEXT_CSS.to_string(),
      "html" | "htm" => mime::TEXT_HTML_UTF_8.to_string(),
      "json" => mime::APPLICATION_JSON.to_string(),
      "png" => mime::IMAGE_PNG.to_string(),
      "jpg" | "jpeg" => mime::IMAGE_JPEG.to_string(),
      "gif" => mime::IMAGE_GIF.to_string(),
      "svg" => mime::IMAGE_SVG.to_string(),
      "webp" => "image/webp".to_string(),
      "ico" => "image/x-icon".to_string(),
      "txt" => mime::TEXT_PLAIN_UTF_8.to_string(),
      "woff" => "font/woff".to_string(),
      "woff2" => "font/woff2".to_string(),
      "ttf" => "font/ttf".to_string(),
      "eot" => "application/vnd.ms-fontobject".to_string(),
      _ => return None,
    })
  });

  by_extension
    .or_else(|| infer::get(content).map(|kind| kind.mime_type().to_string()))
    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}

#[test]
fn test_mime_type_of() {
  use std::path::Path;

  assert_eq!(mime_type_of(Path::new("style.css"), b""), "text/css");
  assert_eq!(mime_type_of(Path::new("unknown"), b""), "application/octet-stream");
}
