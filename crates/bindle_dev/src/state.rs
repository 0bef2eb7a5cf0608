use tokio::sync::{RwLock, broadcast};

use bindle::{BundleOutput, SharedOptions};

use crate::hmr::HmrMessage;

/// Shared server state: the latest good build, the push channel, and the
/// immutable configuration. Only the rebuild coordinator writes `output`;
/// request handlers read.
pub struct DevState {
  pub options: SharedOptions,
  pub output: RwLock<Option<BundleOutput>>,
  pub hmr_tx: broadcast::Sender<HmrMessage>,
  pub http: reqwest::Client,
}

impl DevState {
  pub fn new(options: SharedOptions) -> Self {
    let (hmr_tx, _) = broadcast::channel(16);
    Self { options, output: RwLock::new(None), hmr_tx, http: reqwest::Client::new() }
  }

  /// In-memory artifact lookup by emitted filename.
  pub async fn artifact(&self, filename: &str) -> Option<(Vec<u8>, String)> {
    let output = self.output.read().await;
    let output = output.as_ref()?;
    let asset = output.assets.iter().find(|asset| asset.filename == filename)?;
    let mime = bindle_utils::mime_ext::mime_type_of(std::path::Path::new(filename), &asset.content);
    Some((asset.content.clone(), mime))
  }

  /// The synthesized entry document: a script tag per entry chunk plus the
  /// inline push-channel client.
  pub async fn entry_document(&self) -> String {
    let output = self.output.read().await;
    let scripts = match output.as_ref() {
      Some(output) => self
        .options
        .entries
        .iter()
        .filter_map(|entry| output.manifest.get(&entry.name))
        .map(|src| format!("  <script type=\"module\" src=\"{src}\"></script>\n"))
        .collect::<String>(),
      None => String::new(),
    };
    format!(
      "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n</head>\n<body>\n\
       <div id=\"root\"></div>\n{scripts}  <script>{}</script>\n</body>\n</html>\n",
      client_script(self.options.dev_server.port)
    )
  }

  pub fn broadcast(&self, message: HmrMessage) {
    // No subscribers is fine, updates are best-effort.
    let _ = self.hmr_tx.send(message);
  }
}

/// Minimal client: reconnecting socket that reloads on updates and logs
/// build errors.
fn client_script(port: u16) -> String {
  format!(
    "const ws = new WebSocket('ws://' + location.hostname + ':{port}/__bindle_ws');\n\
     ws.onmessage = (e) => {{\n\
       const msg = JSON.parse(e.data);\n\
       if (msg.type === 'error') {{ console.error('[bindle] build failed:', msg.message); return; }}\n\
       location.reload();\n\
     }};\n"
  )
}
