/// Whitespace-and-comment minification. No parsing happens here: strings,
/// template literals and regex literals are opaque, and JavaScript keeps
/// its newlines so automatic semicolon insertion cannot change meaning.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
  Js,
  Css,
  Other,
}

impl Flavor {
  pub fn of_filename(filename: &str) -> Self {
    if filename.ends_with(".css") {
      Self::Css
    } else if filename.ends_with(".js") || filename.ends_with(".mjs") {
      Self::Js
    } else {
      Self::Other
    }
  }
}

pub fn optimize(bytes: &[u8], flavor: Flavor) -> Vec<u8> {
  match flavor {
    Flavor::Js => optimize_js(bytes),
    Flavor::Css => optimize_css(bytes),
    Flavor::Other => bytes.to_vec(),
  }
}

fn optimize_js(bytes: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(bytes.len());
  let mut pos = 0;
  let mut line_has_content = false;

  while pos < bytes.len() {
    match bytes[pos] {
      b'/' if bytes.get(pos + 1) == Some(&b'/') => {
        while pos < bytes.len() && bytes[pos] != b'\n' {
          pos += 1;
        }
      }
      b'/' if bytes.get(pos + 1) == Some(&b'*') => {
        pos = skip_block_comment(bytes, pos);
      }
      b'/' if regex_may_follow(&out) => {
        pos = copy_regex(bytes, pos, &mut out);
        line_has_content = true;
      }
      quote @ (b'"' | b'\'') => {
        pos = copy_string(bytes, pos, quote, &mut out);
        line_has_content = true;
      }
      b'`' => {
        pos = copy_template(bytes, pos, &mut out);
        line_has_content = true;
      }
      b'\n' => {
        // Blank lines and trailing whitespace go, the newline itself stays.
        while out.last() == Some(&b' ') {
          out.pop();
        }
        if line_has_content {
          out.push(b'\n');
        }
        line_has_content = false;
        pos += 1;
      }
      b' ' | b'\t' | b'\r' => {
        if line_has_content && out.last() != Some(&b' ') {
          out.push(b' ');
        }
        pos += 1;
      }
      byte => {
        out.push(byte);
        line_has_content = true;
        pos += 1;
      }
    }
  }
  while out.last() == Some(&b' ') || out.last() == Some(&b'\n') {
    out.pop();
  }
  if !out.is_empty() {
    out.push(b'\n');
  }
  out
}

fn optimize_css(bytes: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(bytes.len());
  let mut pos = 0;

  while pos < bytes.len() {
    match bytes[pos] {
      b'/' if bytes.get(pos + 1) == Some(&b'*') => {
        pos = skip_block_comment(bytes, pos);
      }
      quote @ (b'"' | b'\'') => {
        pos = copy_string(bytes, pos, quote, &mut out);
      }
      b' ' | b'\t' | b'\r' | b'\n' => {
        if !out.is_empty()
          && out.last() != Some(&b' ')
          && !matches!(out.last(), Some(b'{' | b'}' | b';' | b':' | b','))
        {
          out.push(b' ');
        }
        pos += 1;
      }
      byte @ (b'{' | b'}' | b';' | b':' | b',') => {
        while out.last() == Some(&b' ') {
          out.pop();
        }
        out.push(byte);
        pos += 1;
      }
      byte => {
        out.push(byte);
        pos += 1;
      }
    }
  }
  while out.last() == Some(&b' ') {
    out.pop();
  }
  out
}

/// Whether a `/` at the current output position starts a regex literal
/// rather than division. A regex can follow an operator, an opening
/// bracket, or a keyword like `return`; division follows a value. This is
/// the classic last-significant-token heuristic.
fn regex_may_follow(out: &[u8]) -> bool {
  let mut end = out.len();
  while end > 0 && matches!(out[end - 1], b' ' | b'\n') {
    end -= 1;
  }
  if end == 0 {
    return true;
  }
  let prev = out[end - 1];
  if prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'$' {
    let mut begin = end;
    while begin > 0 && is_ident_byte(out[begin - 1]) {
      begin -= 1;
    }
    return is_regex_prefix_keyword(&out[begin..end]);
  }
  !matches!(prev, b')' | b']' | b'"' | b'\'' | b'`')
}

fn is_ident_byte(byte: u8) -> bool {
  byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

fn is_regex_prefix_keyword(word: &[u8]) -> bool {
  matches!(
    word,
    b"return"
      | b"typeof"
      | b"case"
      | b"in"
      | b"of"
      | b"new"
      | b"delete"
      | b"void"
      | b"instanceof"
      | b"do"
      | b"else"
      | b"yield"
      | b"await"
  )
}

/// Copies a regex literal through verbatim, `/` inside a character class
/// included. If the line ends before a closing `/`, the slash was division
/// after all and only it is emitted.
fn copy_regex(bytes: &[u8], start: usize, out: &mut Vec<u8>) -> usize {
  let mut body = vec![b'/'];
  let mut pos = start + 1;
  let mut in_class = false;
  while pos < bytes.len() {
    let byte = bytes[pos];
    match byte {
      b'\n' => break,
      b'\\' if pos + 1 < bytes.len() => {
        body.push(byte);
        body.push(bytes[pos + 1]);
        pos += 2;
      }
      b'[' => {
        in_class = true;
        body.push(byte);
        pos += 1;
      }
      b']' => {
        in_class = false;
        body.push(byte);
        pos += 1;
      }
      b'/' if !in_class => {
        body.push(byte);
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
          body.push(bytes[pos]);
          pos += 1;
        }
        out.extend_from_slice(&body);
        return pos;
      }
      _ => {
        body.push(byte);
        pos += 1;
      }
    }
  }
  out.push(b'/');
  start + 1
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
  let mut pos = start + 2;
  while pos + 1 < bytes.len() {
    if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
      return pos + 2;
    }
    pos += 1;
  }
  bytes.len()
}

fn copy_string(bytes: &[u8], start: usize, quote: u8, out: &mut Vec<u8>) -> usize {
  let mut pos = start;
  out.push(bytes[pos]);
  pos += 1;
  while pos < bytes.len() {
    let byte = bytes[pos];
    out.push(byte);
    pos += 1;
    if byte == b'\\' && pos < bytes.len() {
      out.push(bytes[pos]);
      pos += 1;
    } else if byte == quote {
      break;
    }
  }
  pos
}

fn copy_template(bytes: &[u8], start: usize, out: &mut Vec<u8>) -> usize {
  let mut pos = start;
  out.push(bytes[pos]);
  pos += 1;
  // `${}` interpolations may nest braces, track the depth.
  let mut brace_depth = 0u32;
  while pos < bytes.len() {
    let byte = bytes[pos];
    out.push(byte);
    pos += 1;
    match byte {
      b'\\' if pos < bytes.len() => {
        out.push(bytes[pos]);
        pos += 1;
      }
      b'$' if brace_depth == 0 && bytes.get(pos) == Some(&b'{') => {
        out.push(b'{');
        pos += 1;
        brace_depth = 1;
      }
      b'{' if brace_depth > 0 => brace_depth += 1,
      b'}' if brace_depth > 0 => brace_depth -= 1,
      b'`' if brace_depth == 0 => break,
      _ => {}
    }
  }
  pos
}
