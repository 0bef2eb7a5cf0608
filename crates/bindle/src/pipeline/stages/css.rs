use bindle_common::{
  DependencyRequest, ImportKind, TransformContext, TransformOutput, TransformStage,
};

/// Stylesheet dependency scanner: `@import` pulls in further stylesheets,
/// `url(...)` references become asset dependencies. The css itself passes
/// through untouched.
pub struct CssStage;

impl TransformStage for CssStage {
  fn name(&self) -> &'static str {
    "css"
  }

  fn transform(
    &self,
    _ctx: &TransformContext<'_>,
    bytes: Vec<u8>,
  ) -> Result<TransformOutput, String> {
    let source =
      std::str::from_utf8(&bytes).map_err(|_| "stylesheet is not valid utf-8".to_string())?;
    let dependencies = scan_css(source);
    Ok(TransformOutput { bytes, dependencies, assets: Vec::new() })
  }
}

fn scan_css(source: &str) -> Vec<DependencyRequest> {
  let bytes = source.as_bytes();
  let mut deps = Vec::new();
  let mut pos = 0;

  while pos < bytes.len() {
    match bytes[pos] {
      b'/' if bytes.get(pos + 1) == Some(&b'*') => {
        pos += 2;
        while pos + 1 < bytes.len() && !(bytes[pos] == b'*' && bytes[pos + 1] == b'/') {
          pos += 1;
        }
        pos = (pos + 2).min(bytes.len());
      }
      b'@' if source[pos..].starts_with("@import") => {
        pos += "@import".len();
        if let Some((specifier, next)) = read_import_target(source, pos) {
          push(&mut deps, specifier, ImportKind::Static);
          pos = next;
        }
      }
      b'u' if source[pos..].starts_with("url(") => {
        pos += "url(".len();
        if let Some((specifier, next)) = read_url_value(source, pos) {
          push(&mut deps, specifier, ImportKind::Url);
          pos = next;
        }
      }
      _ => pos += 1,
    }
  }

  deps
}

/// `@import "a.css"` or `@import url(a.css)`; media queries after the
/// target are ignored.
fn read_import_target(source: &str, pos: usize) -> Option<(String, usize)> {
  let offset = pos + (source[pos..].len() - source[pos..].trim_start().len());
  if source[offset..].starts_with("url(") {
    read_url_value(source, offset + "url(".len())
  } else {
    read_quoted(source, offset)
  }
}

fn read_quoted(source: &str, pos: usize) -> Option<(String, usize)> {
  let bytes = source.as_bytes();
  let quote = *bytes.get(pos)?;
  if quote != b'\'' && quote != b'"' {
    return None;
  }
  let start = pos + 1;
  let end = start + memchr::memchr(quote, &bytes[start..])?;
  Some((source[start..end].to_string(), end + 1))
}

/// Cursor sits after `url(`. The value may be quoted or bare.
fn read_url_value(source: &str, pos: usize) -> Option<(String, usize)> {
  let bytes = source.as_bytes();
  match bytes.get(pos)? {
    b'\'' | b'"' => read_quoted(source, pos),
    _ => {
      let end = pos + memchr::memchr(b')', &bytes[pos..])?;
      Some((source[pos..end].trim().to_string(), end + 1))
    }
  }
}

fn push(deps: &mut Vec<DependencyRequest>, specifier: String, kind: ImportKind) {
  // Fragments, data urls and remote urls are not graph edges.
  if specifier.is_empty()
    || specifier.starts_with('#')
    || specifier.starts_with("data:")
    || specifier.starts_with("http://")
    || specifier.starts_with("https://")
    || specifier.starts_with("//")
  {
    return;
  }
  // css paths are importer-relative without the leading dot convention.
  let specifier = if specifier.starts_with("./")
    || specifier.starts_with("../")
    || specifier.starts_with('/')
  {
    specifier
  } else {
    format!("./{specifier}")
  };
  deps.push(DependencyRequest::new(specifier, kind));
}
