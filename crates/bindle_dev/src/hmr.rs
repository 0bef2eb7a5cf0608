use serde::Serialize;

/// Server-to-client push messages. The tag values are the protocol; clients
/// other than the built-in one key off them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HmrMessage {
  /// A chunk's content changed; `modules` lists the changed stable ids
  /// inside it.
  Update { chunk: String, modules: Vec<String> },
  /// The chunk structure changed in a way updates cannot express.
  FullReload,
  /// A rebuild failed; the previous good output is still being served.
  Error { message: String },
}

impl HmrMessage {
  pub fn to_json(&self) -> String {
    serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"full-reload"}"#.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::HmrMessage;

  #[test]
  fn wire_format() {
    let update = HmrMessage::Update {
      chunk: "main".to_string(),
      modules: vec!["src/app.jsx".to_string()],
    };
    assert_eq!(
      update.to_json(),
      r#"{"type":"update","chunk":"main","modules":["src/app.jsx"]}"#
    );
    assert_eq!(HmrMessage::FullReload.to_json(), r#"{"type":"full-reload"}"#);
    assert_eq!(
      HmrMessage::Error { message: "boom".to_string() }.to_json(),
      r#"{"type":"error","message":"boom"}"#
    );
  }
}
