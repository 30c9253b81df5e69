use crate::domain::logging::LogComponent;
use crate::log_debug;

const COMPONENT: LogComponent = LogComponent::Application("Backfill");

/// True when the earliest visible index is within `threshold` of the start
/// of loaded data.
pub fn should_fetch_history(first_visible_index: usize, threshold: usize) -> bool {
    first_visible_index < threshold
}

type BackfillHook = Box<dyn FnMut()>;

/// Rate-limits "need older history" signals coming from the surface.
///
/// Knows nothing about page sizes or splicing; it only decides whether a
/// signal reaches the host hook.
pub struct BackfillController {
    cooldown_ms: u64,
    last_request_ms: Option<u64>,
    hook: Option<BackfillHook>,
    forwarded: u64,
    dropped: u64,
}

impl BackfillController {
    pub fn new(cooldown_ms: u64) -> Self {
        Self { cooldown_ms, last_request_ms: None, hook: None, forwarded: 0, dropped: 0 }
    }

    /// Register the host's "fetch older history" hook, replacing any previous one
    pub fn on_backfill_requested<F>(&mut self, hook: F)
    where
        F: FnMut() + 'static,
    {
        self.hook = Some(Box::new(hook));
    }

    /// Feed one `viewportNearEdge` signal. Returns whether it was forwarded.
    pub fn signal(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_request_ms {
            // A clock that runs backwards counts as no time elapsed
            if now_ms.saturating_sub(last) < self.cooldown_ms {
                self.dropped += 1;
                log_debug!(COMPONENT, "backfill signal at {} throttled", now_ms);
                return false;
            }
        }
        self.last_request_ms = Some(now_ms);
        self.forwarded += 1;
        log_debug!(COMPONENT, "forwarding backfill request at {}", now_ms);
        if let Some(hook) = self.hook.as_mut() {
            hook();
        }
        true
    }

    pub fn last_request_ms(&self) -> Option<u64> {
        self.last_request_ms
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
