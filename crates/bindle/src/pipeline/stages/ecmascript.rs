use bindle_common::{
  DependencyRequest, ImportKind, TransformContext, TransformOutput, TransformStage,
};
use bindle_utils::indexmap::FxIndexMap;
use itertools::Itertools;

/// Lexical dependency scanner for script modules. This is not a parser: it
/// walks the byte stream skipping comments, strings, template literals and
/// regex literals, and recognizes the four import forms at identifier
/// boundaries. Anything it cannot statically see (computed dynamic
/// imports) is left alone.
pub struct EcmascriptStage {
  define: FxIndexMap<String, String>,
}

impl EcmascriptStage {
  pub fn new(define: FxIndexMap<String, String>) -> Self {
    Self { define }
  }

  /// `process.env.KEY` substitution, longest key first so `API_URL` is not
  /// shadowed by `API`.
  fn apply_define(&self, source: &str) -> String {
    let mut output = source.to_string();
    for key in self.define.keys().sorted_by_key(|key| std::cmp::Reverse(key.len())) {
      let needle = format!("process.env.{key}");
      let replacement = serde_json::Value::String(self.define[key].clone()).to_string();
      output = output.replace(&needle, &replacement);
    }
    output
  }
}

impl TransformStage for EcmascriptStage {
  fn name(&self) -> &'static str {
    "ecmascript"
  }

  fn transform(
    &self,
    _ctx: &TransformContext<'_>,
    bytes: Vec<u8>,
  ) -> Result<TransformOutput, String> {
    let source =
      String::from_utf8(bytes).map_err(|_| "module is not valid utf-8".to_string())?;
    let source = if self.define.is_empty() { source } else { self.apply_define(&source) };
    let dependencies = scan_dependencies(&source);
    Ok(TransformOutput { bytes: source.into_bytes(), dependencies, assets: Vec::new() })
  }
}

pub fn scan_dependencies(source: &str) -> Vec<DependencyRequest> {
  Scanner::new(source).run()
}

/// The token kind a `/` could follow: a regex is legal after punctuation
/// or a keyword like `return`, division after a value or identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastToken {
  Start,
  Value,
  Word,
  RegexPrefixKeyword,
  Punct,
}

struct Scanner<'a> {
  bytes: &'a [u8],
  pos: usize,
  deps: Vec<DependencyRequest>,
  last: LastToken,
}

impl<'a> Scanner<'a> {
  fn new(source: &'a str) -> Self {
    Self { bytes: source.as_bytes(), pos: 0, deps: Vec::new(), last: LastToken::Start }
  }

  fn run(mut self) -> Vec<DependencyRequest> {
    while self.pos < self.bytes.len() {
      match self.bytes[self.pos] {
        b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
        b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
        b'/' => {
          if self.regex_allowed() {
            let before = self.pos;
            self.skip_regex();
            self.last =
              if self.pos > before + 1 { LastToken::Value } else { LastToken::Punct };
          } else {
            self.pos += 1;
            self.last = LastToken::Punct;
          }
        }
        quote @ (b'\'' | b'"') => {
          self.pos += 1;
          self.skip_string(quote);
          self.last = LastToken::Value;
        }
        b'`' => {
          self.pos += 1;
          self.skip_template();
          self.last = LastToken::Value;
        }
        byte if is_ident_start(byte) => {
          let at_boundary = self
            .pos
            .checked_sub(1)
            .map_or(true, |prev| !is_ident_continue(self.bytes[prev]) && self.bytes[prev] != b'.');
          let word = self.read_word();
          self.last = if is_regex_prefix_keyword(word) {
            LastToken::RegexPrefixKeyword
          } else {
            LastToken::Word
          };
          if at_boundary {
            match word {
              "import" => self.after_import(),
              "export" => self.after_export(),
              "require" => self.after_require(),
              _ => {}
            }
          }
        }
        byte => {
          if !byte.is_ascii_whitespace() {
            self.last = match byte {
              b')' | b']' => LastToken::Value,
              b'0'..=b'9' => LastToken::Word,
              _ => LastToken::Punct,
            };
          }
          self.pos += 1;
        }
      }
    }
    self.deps
  }

  fn regex_allowed(&self) -> bool {
    matches!(self.last, LastToken::Start | LastToken::Punct | LastToken::RegexPrefixKeyword)
  }

  /// Cursor sits on the opening `/`. If no closing slash appears before
  /// the line ends, the slash was division and the cursor moves past it
  /// alone.
  fn skip_regex(&mut self) {
    let start = self.pos;
    self.pos += 1;
    let mut in_class = false;
    while self.pos < self.bytes.len() {
      match self.bytes[self.pos] {
        b'\n' => break,
        b'\\' => self.pos += 2,
        b'[' => {
          in_class = true;
          self.pos += 1;
        }
        b']' => {
          in_class = false;
          self.pos += 1;
        }
        b'/' if !in_class => {
          self.pos += 1;
          while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_alphabetic() {
            self.pos += 1;
          }
          return;
        }
        _ => self.pos += 1,
      }
    }
    self.pos = start + 1;
  }

  fn peek(&self, offset: usize) -> Option<u8> {
    self.bytes.get(self.pos + offset).copied()
  }

  fn skip_line_comment(&mut self) {
    match memchr::memchr(b'\n', &self.bytes[self.pos..]) {
      Some(offset) => self.pos += offset + 1,
      None => self.pos = self.bytes.len(),
    }
  }

  fn skip_block_comment(&mut self) {
    self.pos += 2;
    while self.pos + 1 < self.bytes.len() {
      if self.bytes[self.pos] == b'*' && self.bytes[self.pos + 1] == b'/' {
        self.pos += 2;
        return;
      }
      self.pos += 1;
    }
    self.pos = self.bytes.len();
  }

  /// Cursor sits after the opening quote; leaves it after the closing one.
  fn skip_string(&mut self, quote: u8) {
    while self.pos < self.bytes.len() {
      match self.bytes[self.pos] {
        b'\\' => self.pos += 2,
        byte if byte == quote => {
          self.pos += 1;
          return;
        }
        _ => self.pos += 1,
      }
    }
  }

  /// Template literals: `${` expressions are skipped by brace counting.
  /// A backtick inside a nested expression string will confuse this — an
  /// accepted limitation of lexical scanning.
  fn skip_template(&mut self) {
    while self.pos < self.bytes.len() {
      match self.bytes[self.pos] {
        b'\\' => self.pos += 2,
        b'`' => {
          self.pos += 1;
          return;
        }
        b'$' if self.peek(1) == Some(b'{') => {
          self.pos += 2;
          let mut depth = 1usize;
          while self.pos < self.bytes.len() && depth > 0 {
            match self.bytes[self.pos] {
              b'{' => depth += 1,
              b'}' => depth -= 1,
              _ => {}
            }
            self.pos += 1;
          }
        }
        _ => self.pos += 1,
      }
    }
  }

  fn read_word(&mut self) -> &'a str {
    let start = self.pos;
    while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos]) {
      self.pos += 1;
    }
    // Scanner input is a &str, so slicing at ascii-identifier boundaries is safe.
    std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("")
  }

  fn skip_trivia(&mut self) {
    loop {
      match self.bytes.get(self.pos) {
        Some(byte) if byte.is_ascii_whitespace() => self.pos += 1,
        Some(b'/') if self.peek(1) == Some(b'/') => self.skip_line_comment(),
        Some(b'/') if self.peek(1) == Some(b'*') => self.skip_block_comment(),
        _ => return,
      }
    }
  }

  fn read_string_literal(&mut self) -> Option<String> {
    let quote = match self.bytes.get(self.pos) {
      Some(quote @ (b'\'' | b'"')) => *quote,
      _ => return None,
    };
    self.pos += 1;
    let start = self.pos;
    self.skip_string(quote);
    let end = self.pos.saturating_sub(1);
    std::str::from_utf8(&self.bytes[start..end]).ok().map(ToOwned::to_owned)
  }

  fn push(&mut self, specifier: String, kind: ImportKind) {
    if !specifier.is_empty() {
      self.deps.push(DependencyRequest::new(specifier, kind));
    }
  }

  /// `import '...'`, `import x from '...'`, `import('...')`.
  fn after_import(&mut self) {
    self.skip_trivia();
    match self.bytes.get(self.pos) {
      Some(b'(') => {
        self.pos += 1;
        self.skip_trivia();
        if let Some(specifier) = self.read_string_literal() {
          self.push(specifier, ImportKind::DynamicImport);
        }
      }
      Some(b'\'' | b'"') => {
        if let Some(specifier) = self.read_string_literal() {
          self.push(specifier, ImportKind::Static);
        }
      }
      _ => self.scan_from_clause(),
    }
  }

  /// Only `export ... from '...'` declares a dependency. Declaration forms
  /// (`export default`, `export const`, ...) are skipped outright so we
  /// never misread a string inside a declared body.
  fn after_export(&mut self) {
    self.skip_trivia();
    match self.bytes.get(self.pos) {
      Some(b'{') => {
        // Skip the export clause, then expect an optional from clause.
        while let Some(byte) = self.bytes.get(self.pos) {
          self.pos += 1;
          if *byte == b'}' {
            break;
          }
        }
        self.scan_from_clause();
      }
      Some(b'*') => {
        self.pos += 1;
        self.scan_from_clause();
      }
      _ => {}
    }
  }

  fn after_require(&mut self) {
    self.skip_trivia();
    if self.bytes.get(self.pos) == Some(&b'(') {
      self.pos += 1;
      self.skip_trivia();
      if let Some(specifier) = self.read_string_literal() {
        self.push(specifier, ImportKind::Static);
      }
    }
  }

  /// Scan forward within the statement for `from '...'`; gives up at `;`.
  fn scan_from_clause(&mut self) {
    let mut last_word_was_from = false;
    while self.pos < self.bytes.len() {
      self.skip_trivia();
      match self.bytes.get(self.pos) {
        None | Some(b';') => {
          self.pos += 1;
          return;
        }
        Some(b'\'' | b'"') => {
          if let Some(specifier) = self.read_string_literal() {
            if last_word_was_from {
              self.push(specifier, ImportKind::Static);
            }
          }
          return;
        }
        Some(byte) if is_ident_start(*byte) => {
          last_word_was_from = self.read_word() == "from";
        }
        _ => self.pos += 1,
      }
    }
  }
}

fn is_regex_prefix_keyword(word: &str) -> bool {
  matches!(
    word,
    "return"
      | "typeof"
      | "case"
      | "in"
      | "of"
      | "new"
      | "delete"
      | "void"
      | "instanceof"
      | "do"
      | "else"
      | "yield"
      | "await"
  )
}

fn is_ident_start(byte: u8) -> bool {
  byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$'
}

fn is_ident_continue(byte: u8) -> bool {
  byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

#[cfg(test)]
mod tests {
  use super::*;
  use bindle_common::ModuleId;

  fn kinds(source: &str) -> Vec<(String, ImportKind)> {
    scan_dependencies(source)
      .into_iter()
      .map(|dep| (dep.specifier.to_string(), dep.kind))
      .collect()
  }

  #[test]
  fn static_import_forms() {
    let source = r#"
      import React from 'react';
      import { useState } from "react";
      import './styles.css';
      import * as utils from './utils';
      export { helper } from './helpers';
      export * from './everything';
      const legacy = require('./legacy');
    "#;
    let found = kinds(source);
    let specifiers: Vec<&str> = found.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(
      specifiers,
      ["react", "react", "./styles.css", "./utils", "./helpers", "./everything", "./legacy"]
    );
    assert!(found.iter().all(|(_, kind)| *kind == ImportKind::Static));
  }

  #[test]
  fn dynamic_import_is_a_boundary() {
    let found = kinds("const page = import('./pages/Dashboard');");
    assert_eq!(found, vec![("./pages/Dashboard".to_string(), ImportKind::DynamicImport)]);
  }

  #[test]
  fn strings_comments_and_templates_are_opaque() {
    let source = r#"
      // import fake from './in-comment';
      /* import fake2 from './in-block'; */
      const a = "import fake3 from './in-string';";
      const b = `import fake4 from './in-template';`;
      const c = `${"no import('./here') either"}`;
    "#;
    assert!(kinds(source).is_empty());
  }

  #[test]
  fn regex_literals_are_opaque() {
    let source = "const re = /'/;\nimport x from './y.js';\n";
    assert_eq!(kinds(source), vec![("./y.js".to_string(), ImportKind::Static)]);
  }

  #[test]
  fn regex_with_escapes_and_classes_hides_nothing() {
    let source = r#"
      const slash = /\//g;
      const clazz = /["'`]/;
      import './after.js';
    "#;
    assert_eq!(kinds(source), vec![("./after.js".to_string(), ImportKind::Static)]);
  }

  #[test]
  fn division_does_not_eat_the_rest_of_the_line() {
    let source = "const half = total / 2; require('./math.js');\n";
    assert_eq!(kinds(source), vec![("./math.js".to_string(), ImportKind::Static)]);
  }

  #[test]
  fn declarations_are_not_reexports() {
    let source = r#"
      export default function render() { return "from './nowhere'"; }
      export const from = 'not a dependency';
    "#;
    assert!(kinds(source).is_empty());
  }

  #[test]
  fn member_access_is_not_an_import() {
    assert!(kinds("loader.import('./x'); obj.require('./y');").is_empty());
  }

  #[test]
  fn define_substitution() {
    let mut define = FxIndexMap::default();
    define.insert("API_URL".to_string(), "https://api.example".to_string());
    let stage = EcmascriptStage::new(define);
    let id = ModuleId::new("/project/src/config.js");
    let ctx = TransformContext { id: &id, options: &serde_json::Value::Null };
    let output =
      stage.transform(&ctx, b"const url = process.env.API_URL;".to_vec()).unwrap();
    assert_eq!(
      String::from_utf8(output.bytes).unwrap(),
      r#"const url = "https://api.example";"#
    );
  }
}
