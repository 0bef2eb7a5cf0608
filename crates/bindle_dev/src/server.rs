use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{
  Router,
  body::Body,
  extract::{
    Request, State, WebSocketUpgrade,
    ws::{Message, WebSocket},
  },
  http::{StatusCode, header},
  response::{Html, IntoResponse, Response},
  routing::get,
};
use tokio::sync::broadcast;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use bindle::Bundler;
use bindle_error::{BuildResult, BundleError};

use crate::{
  state::DevState,
  watch::{rebuild_loop, spawn_watcher},
};

/// Request body cap for proxied requests.
const PROXY_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// The development server: serves the in-memory build, proxies configured
/// prefixes, and pushes rebuild notifications over `/__bindle_ws`.
pub struct DevServer {
  bundler: Bundler,
}

impl DevServer {
  pub fn new(bundler: Bundler) -> Self {
    Self { bundler }
  }

  pub async fn serve(mut self) -> BuildResult<()> {
    let options = self.bundler.options().clone();
    let state = Arc::new(DevState::new(options.clone()));

    // Initial build. A failure is not fatal: the server starts anyway and
    // the first successful rebuild fills the store.
    match self.bundler.build().await {
      Ok(output) => *state.output.write().await = Some(output),
      Err(errors) => tracing::error!(%errors, "initial build failed"),
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let _watcher = spawn_watcher(&options.cwd, tx).map_err(|err| {
      BundleError::Config(format!("cannot watch {}: {err}", options.cwd.display()))
    })?;
    tokio::spawn(rebuild_loop(state.clone(), self.bundler, rx));

    let app = router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], options.dev_server.port));
    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .map_err(|err| BundleError::Config(format!("cannot bind {addr}: {err}")))?;
    tracing::info!(%addr, "dev server listening");
    if options.dev_server.open {
      open_browser(&format!("http://{addr}/"));
    }
    axum::serve(listener, app)
      .await
      .map_err(|err| BundleError::Config(format!("server error: {err}")))?;
    Ok(())
  }
}

fn open_browser(url: &str) {
  let spawned = if cfg!(target_os = "macos") {
    std::process::Command::new("open").arg(url).spawn()
  } else if cfg!(target_os = "windows") {
    std::process::Command::new("cmd").args(["/C", "start", url]).spawn()
  } else {
    std::process::Command::new("xdg-open").arg(url).spawn()
  };
  if let Err(err) = spawned {
    tracing::warn!(error = %err, url, "could not open a browser");
  }
}

fn router(state: Arc<DevState>) -> Router {
  Router::new()
    .route("/__bindle_ws", get(ws_handler))
    .fallback(handle_request)
    .with_state(state)
    .layer(TraceLayer::new_for_http())
    .layer(CompressionLayer::new())
}

async fn ws_handler(
  ws: WebSocketUpgrade,
  State(state): State<Arc<DevState>>,
) -> Response {
  ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<DevState>) {
  let mut rx = state.hmr_tx.subscribe();
  loop {
    tokio::select! {
      pushed = rx.recv() => match pushed {
        Ok(message) => {
          if socket.send(Message::Text(message.to_json())).await.is_err() {
            break;
          }
        }
        Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => break,
      },
      incoming = socket.recv() => match incoming {
        // Clients only listen; anything inbound besides keepalives means
        // the connection is going away.
        Some(Ok(_)) => {}
        _ => break,
      },
    }
  }
}

async fn handle_request(State(state): State<Arc<DevState>>, req: Request) -> Response {
  let path = req.uri().path().to_string();

  if let Some((_, origin)) = match_proxy(&state.options.dev_server.proxy, &path) {
    let origin = origin.to_string();
    return proxy_request(&state, req, &origin).await;
  }

  let filename = path.trim_start_matches('/');
  if !filename.is_empty() {
    if let Some((content, mime)) = state.artifact(filename).await {
      return artifact_response(content, &mime);
    }
    if let Some(static_dir) = &state.options.dev_server.static_dir {
      if let Some(response) = serve_static(static_dir, filename).await {
        return response;
      }
    }
  }

  // The root document is always synthesized; other paths fall back to it
  // only under the single-page policy, and never for asset-looking paths.
  if path == "/"
    || (state.options.dev_server.history_fallback && !is_asset_path(&path))
  {
    return Html(state.entry_document().await).into_response();
  }

  StatusCode::NOT_FOUND.into_response()
}

fn artifact_response(content: Vec<u8>, mime: &str) -> Response {
  Response::builder()
    .status(StatusCode::OK)
    .header(header::CONTENT_TYPE, mime)
    .body(Body::from(content))
    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Longest-prefix proxy match on path-segment boundaries. The proxy table
/// is pre-sorted longest first.
fn match_proxy<'a>(proxy: &'a [(String, String)], path: &str) -> Option<(&'a str, &'a str)> {
  proxy
    .iter()
    .find(|(prefix, _)| {
      path.strip_prefix(prefix.as_str())
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'))
    })
    .map(|(prefix, origin)| (prefix.as_str(), origin.as_str()))
}

/// Paths with a file extension in the final segment are asset requests:
/// they are served literally or 404, never rewritten to the entry document.
fn is_asset_path(path: &str) -> bool {
  path.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
}

async fn serve_static(static_dir: &Path, filename: &str) -> Option<Response> {
  // No traversal out of the static root.
  if Path::new(filename).components().any(|c| !matches!(c, std::path::Component::Normal(_))) {
    return None;
  }
  let full = static_dir.join(filename);
  let content = tokio::fs::read(&full).await.ok()?;
  let mime = bindle_utils::mime_ext::mime_type_of(&full, &content);
  Some(artifact_response(content, &mime))
}

/// Forwards the request to the configured backend origin with the original
/// path and query preserved.
async fn proxy_request(state: &DevState, req: Request, origin: &str) -> Response {
  let path_and_query = req
    .uri()
    .path_and_query()
    .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
  let url = format!("{}{path_and_query}", origin.trim_end_matches('/'));

  let (parts, body) = req.into_parts();
  let Ok(bytes) = axum::body::to_bytes(body, PROXY_BODY_LIMIT).await else {
    return StatusCode::PAYLOAD_TOO_LARGE.into_response();
  };

  let method =
    reqwest::Method::from_bytes(parts.method.as_str().as_bytes()).unwrap_or(reqwest::Method::GET);
  let mut upstream_req = state.http.request(method, url).body(bytes.to_vec());
  for (name, value) in &parts.headers {
    if name == header::HOST {
      continue;
    }
    upstream_req = upstream_req.header(name, value);
  }

  match upstream_req.send().await {
    Ok(upstream) => {
      let status = upstream.status().as_u16();
      let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
      let body = upstream.bytes().await.unwrap_or_default();
      let mut response = Response::builder().status(status);
      if let Some(content_type) = content_type {
        response = response.header(header::CONTENT_TYPE, content_type);
      }
      response
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
    }
    Err(err) => {
      tracing::warn!(error = %err, url = %path_and_query, "proxy upstream unreachable");
      StatusCode::BAD_GATEWAY.into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt;

  use bindle::{
    ArtifactKind, BundleOutput, BundlerOptions, DevServerOptions, Manifest, OutputAsset,
    normalize_options,
  };
  use bindle_utils::indexmap::FxIndexMap;

  use super::{DevState, is_asset_path, match_proxy, router};

  fn table() -> Vec<(String, String)> {
    vec![
      ("/api/v2".to_string(), "http://localhost:6000".to_string()),
      ("/api".to_string(), "http://localhost:5000".to_string()),
    ]
  }

  #[test]
  fn proxy_prefix_matching() {
    let proxy = table();
    assert_eq!(
      match_proxy(&proxy, "/api/users"),
      Some(("/api", "http://localhost:5000"))
    );
    assert_eq!(
      match_proxy(&proxy, "/api/v2/users"),
      Some(("/api/v2", "http://localhost:6000"))
    );
    assert_eq!(match_proxy(&proxy, "/api"), Some(("/api", "http://localhost:5000")));
    // Segment boundary: "/apifoo" is not under "/api".
    assert_eq!(match_proxy(&proxy, "/apifoo"), None);
    assert_eq!(match_proxy(&proxy, "/other"), None);
  }

  #[test]
  fn asset_paths_never_fall_back() {
    assert!(is_asset_path("/logo.svg"));
    assert!(is_asset_path("/assets/app.abc123.js"));
    assert!(!is_asset_path("/users/42"));
    assert!(!is_asset_path("/"));
  }

  /// A state holding one finished build: a single `main.js` chunk.
  async fn state_with_build(dev: DevServerOptions) -> Arc<DevState> {
    let options = normalize_options(BundlerOptions {
      cwd: Some("/project".into()),
      dev_server: Some(dev),
      ..Default::default()
    })
    .unwrap();
    let state = Arc::new(DevState::new(Arc::new(options)));

    let mut manifest = Manifest::default();
    manifest.insert("main", "/main.js");
    *state.output.write().await = Some(BundleOutput {
      assets: vec![OutputAsset {
        filename: "main.js".to_string(),
        content: b"boot();\n".to_vec(),
        kind: ArtifactKind::Chunk { name: "main".into() },
      }],
      manifest,
      warnings: Vec::new(),
    });
    state
  }

  fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
  }

  async fn body_of(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
  }

  #[tokio::test]
  async fn artifacts_win_over_the_entry_document() {
    let state = state_with_build(DevServerOptions {
      history_fallback: Some(true),
      ..Default::default()
    })
    .await;
    let app = router(state);

    let response = app.clone().oneshot(get("/main.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_of(response).await, b"boot();\n");

    // A client-routed path rewrites to the document, scripts included.
    let response = app.clone().oneshot(get("/dashboard/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_of(response).await).unwrap();
    assert!(html.contains("src=\"/main.js\""));

    // An asset-looking path is served literally or not at all.
    let response = app.oneshot(get("/logo.svg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn unknown_paths_are_404_without_history_fallback() {
    let state = state_with_build(DevServerOptions::default()).await;
    let app = router(state);

    let response = app.clone().oneshot(get("/dashboard/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn proxy_preserves_path_and_query() {
    // An upstream that echoes whatever path and query it receives.
    let upstream = axum::Router::new().fallback(|req: axum::extract::Request| async move {
      req.uri().path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_default()
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let _ = axum::serve(listener, upstream).await;
    });

    let mut proxy = FxIndexMap::default();
    proxy.insert("/api".to_string(), format!("http://{addr}"));
    let state =
      state_with_build(DevServerOptions { proxy: Some(proxy), ..Default::default() }).await;
    let app = router(state);

    let response = app.oneshot(get("/api/users?id=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_of(response).await, b"/api/users?id=1");
  }
}
