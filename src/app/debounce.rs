use std::time::Duration;
use tokio::sync::watch;

use crate::filter::FilterSpec;

/// Collapse bursts of filter edits into the last one.
///
/// Built on a `watch` channel, which only ever holds the latest spec, so an
/// older edit can never be applied after a newer one.
pub fn debounced_filters(quiet: Duration) -> (FilterSender, SettledFilters) {
    let (tx, rx) = watch::channel(FilterSpec::default());
    (FilterSender { tx }, SettledFilters { rx, quiet })
}

#[derive(Debug, Clone)]
pub struct FilterSender {
    tx: watch::Sender<FilterSpec>,
}

impl FilterSender {
    pub fn submit(&self, spec: FilterSpec) {
        self.tx.send_replace(spec);
    }
}

#[derive(Debug)]
pub struct SettledFilters {
    rx: watch::Receiver<FilterSpec>,
    quiet: Duration,
}

impl SettledFilters {
    /// Wait for an edit, then for `quiet` without further edits. Returns the
    /// latest spec, or `None` once the sender is gone and nothing is pending.
    pub async fn next(&mut self) -> Option<FilterSpec> {
        self.rx.changed().await.ok()?;
        loop {
            match tokio::time::timeout(self.quiet, self.rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => break,
            }
        }
        Some(self.rx.borrow_and_update().clone())
    }
}
