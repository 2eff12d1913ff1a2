use crate::config::PortalSettings;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

/// Last-write-wins gate for search-as-you-type input.
///
/// Each keystroke calls [`Debouncer::settle`]; only the call that is still
/// the newest once the quiet period elapses gets `true`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_settings(settings: &PortalSettings) -> Self {
        Self::new(Duration::from_millis(settings.search_debounce_ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn settle(&self) -> bool {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }
}
