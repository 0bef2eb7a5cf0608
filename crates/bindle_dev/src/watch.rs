use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use bindle::Bundler;

use crate::{hmr::HmrMessage, state::DevState};

/// Changes landing within this window are coalesced into one rebuild.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

/// Starts the recursive filesystem watcher. The returned watcher must stay
/// alive for events to keep flowing.
pub fn spawn_watcher(
  root: &Path,
  tx: UnboundedSender<PathBuf>,
) -> notify::Result<RecommendedWatcher> {
  let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
    match result {
      Ok(event) => {
        for path in event.paths {
          if !is_ignored(&path) {
            let _ = tx.send(path);
          }
        }
      }
      Err(err) => tracing::warn!(error = %err, "watch error"),
    }
  })?;
  watcher.watch(root, RecursiveMode::Recursive)?;
  Ok(watcher)
}

fn is_ignored(path: &Path) -> bool {
  let rendered = path.to_string_lossy();
  if rendered.contains("/node_modules/")
    || rendered.contains("/.git/")
    || rendered.contains("/dist/")
    || rendered.contains("/target/")
  {
    return true;
  }
  path
    .file_name()
    .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// The rebuild coordinator. Owns the bundler, so rebuilds never contend
/// with request handlers; everything the handlers need is published through
/// `DevState`. Changes arriving while a rebuild runs mark its result stale:
/// the result is discarded and a fresh rebuild starts from the union of
/// pending changes.
pub async fn rebuild_loop(
  state: Arc<DevState>,
  mut bundler: Bundler,
  mut rx: UnboundedReceiver<PathBuf>,
) {
  let mut pending: FxHashSet<PathBuf> = FxHashSet::default();
  let mut generation: u64 = 0;

  loop {
    if pending.is_empty() {
      let Some(path) = rx.recv().await else { return };
      generation += 1;
      pending.insert(path);
    }

    // Coalesce the burst.
    loop {
      match tokio::time::timeout(DEBOUNCE_WINDOW, rx.recv()).await {
        Ok(Some(path)) => {
          generation += 1;
          pending.insert(path);
        }
        Ok(None) => return,
        Err(_) => break,
      }
    }

    let before = generation;
    let changed: Vec<PathBuf> = pending.iter().cloned().collect();
    let result = bundler.rebuild(changed).await;

    // Drain anything that arrived mid-rebuild.
    while let Ok(path) = rx.try_recv() {
      generation += 1;
      pending.insert(path);
    }
    if generation != before {
      // Stale result; rebuild again with the full pending set.
      continue;
    }

    pending.clear();
    match result {
      Ok(summary) => {
        let full_reload = summary.full_reload;
        let updates = summary.updates.clone();
        *state.output.write().await = Some(summary.output);
        if full_reload {
          state.broadcast(HmrMessage::FullReload);
        } else {
          for update in updates {
            state.broadcast(HmrMessage::Update { chunk: update.chunk, modules: update.modules });
          }
        }
      }
      Err(errors) => {
        tracing::warn!(%errors, "rebuild failed, previous output stays servable");
        state.broadcast(HmrMessage::Error { message: errors.to_string() });
      }
    }
  }
}
