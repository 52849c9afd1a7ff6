// src/watch/watcher.rs

use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::compile::ModuleCompiler;
use crate::load::ModuleLoader;
use crate::watch::reload::{ConfigWatch, ReloadOutcome};

/// How long to wait for a burst of events (editor save, git checkout) to
/// settle before reloading.
pub const DEBOUNCE: Duration = Duration::from_millis(150);

/// Watch the project root and reload the configuration on every relevant
/// change until Ctrl-C.
///
/// `on_reload` is called with each newly validated configuration.
pub async fn run_watch<C, L, F>(mut watch: ConfigWatch<C, L>, mut on_reload: F) -> Result<()>
where
    C: ModuleCompiler,
    L: ModuleLoader,
    F: FnMut(&crate::config::LoadedConfig),
{
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            forward_event(&event_tx, res);
        },
        Config::default(),
    )?;

    let root = watch.root().canonicalize().unwrap_or_else(|_| watch.root().to_path_buf());
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("watching {:?} for configuration changes (Ctrl-C to stop)", root);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let event = tokio::select! {
            _ = &mut shutdown => {
                info!("stopping watch");
                break;
            }
            event = event_rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if event.paths.iter().all(|path| watch.is_ignored(path)) {
            continue;
        }
        debug!(?event, "relevant change");

        // Let the burst settle, then drop whatever else arrived meanwhile.
        tokio::time::sleep(DEBOUNCE).await;
        while event_rx.try_recv().is_ok() {}

        match watch.reload() {
            ReloadOutcome::Unchanged => debug!("configuration unchanged"),
            ReloadOutcome::Reloaded(loaded) => on_reload(&loaded),
            ReloadOutcome::Failed(err) => {
                error!("{err}");
                if let Some(hint) = err.hint() {
                    warn!("{hint}; keeping the previous configuration");
                }
            }
        }
    }

    drop(watcher);
    Ok(())
}

/// Pass a notify callback result on to the async loop. Runs on notify's
/// thread; returns whether an event was queued.
fn forward_event(tx: &mpsc::UnboundedSender<Event>, res: notify::Result<Event>) -> bool {
    match res {
        Ok(event) => match tx.send(event) {
            Ok(()) => true,
            Err(err) => {
                warn!(event = ?err.0, "watch loop has stopped; dropping file event");
                false
            }
        },
        Err(err) => {
            error!(paths = ?err.paths, "file watch error: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use notify::EventKind;

    #[test]
    fn events_are_forwarded_until_the_loop_stops() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let event = Event::new(EventKind::Any).add_path("/site/quartz/quartz.config.js".into());

        assert!(forward_event(&tx, Ok(event.clone())));
        assert_eq!(rx.try_recv().unwrap().paths, event.paths);

        drop(rx);
        assert!(!forward_event(&tx, Ok(event)));
    }

    #[test]
    fn watch_errors_are_not_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = notify::Error::generic("inotify limit reached");

        assert!(!forward_event(&tx, Err(err)));
        assert!(rx.try_recv().is_err());
    }
}
