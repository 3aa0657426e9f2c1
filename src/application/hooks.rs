//! Named hook registry.
//!
//! Plugins register handlers under a hook name; the host fires the hook
//! with a [`HookEvent`] whenever the matching thing happens.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::HookEvent;

/// A subscriber to a named hook. Handlers must return without blocking.
pub trait HookHandler: Send + Sync {
    fn handle(&self, event: &HookEvent);
}

/// Registry mapping hook names to their handlers.
#[derive(Default)]
pub struct HookRegistry {
    handlers: HashMap<String, Vec<Arc<dyn HookHandler>>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler` to the subscribers of `hook`.
    pub fn register(&mut self, hook: &str, handler: Arc<dyn HookHandler>) {
        tracing::debug!(hook, "Registered hook handler");
        self.handlers.entry(hook.to_string()).or_default().push(handler);
    }

    /// Invoke every handler of `hook` in registration order.
    ///
    /// Returns the number of handlers invoked; unknown hooks are a no-op.
    pub fn dispatch(&self, hook: &str, event: &HookEvent) -> usize {
        let Some(handlers) = self.handlers.get(hook) else {
            tracing::trace!(hook, "No handlers for hook");
            return 0;
        };

        for handler in handlers {
            handler.handle(event);
        }

        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sources: Mutex<Vec<Option<String>>>,
    }

    impl HookHandler for Recorder {
        fn handle(&self, event: &HookEvent) {
            self.sources.lock().unwrap().push(event.source.clone());
        }
    }

    #[test]
    fn test_dispatch_reaches_registered_handlers() {
        let mut hooks = HookRegistry::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        hooks.register("device_activity", first.clone());
        hooks.register("device_activity", second.clone());

        let invoked = hooks.dispatch("device_activity", &HookEvent::from_source("lamp"));

        assert_eq!(invoked, 2);
        assert_eq!(*first.sources.lock().unwrap(), vec![Some("lamp".to_string())]);
        assert_eq!(second.sources.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dispatch_is_scoped_to_hook_name() {
        let mut hooks = HookRegistry::new();
        let recorder = Arc::new(Recorder::default());
        hooks.register("device_activity", recorder.clone());

        assert_eq!(hooks.dispatch("device_removed", &HookEvent::default()), 0);
        assert!(recorder.sources.lock().unwrap().is_empty());
    }
}
