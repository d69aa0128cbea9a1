//! Named cleanup actions run once when the bot shuts down.

use parking_lot::Mutex;
use tracing::{debug, info};

type Hook = Box<dyn FnOnce() + Send>;

/// Cleanup actions, run in reverse registration order exactly once.
///
/// Hooks run on [`run`](Self::run) or when the owner is dropped, whichever
/// comes first. A hook registered after that runs immediately.
pub struct ShutdownHooks {
    hooks: Mutex<Option<Vec<(String, Hook)>>>,
}

impl Default for ShutdownHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHooks {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Some(Vec::new())),
        }
    }

    /// Registers a named hook.
    pub fn register<F>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let mut guard = self.hooks.lock();
        match guard.as_mut() {
            Some(hooks) => {
                debug!(hook = %name, "Shutdown hook registered");
                hooks.push((name, Box::new(hook)));
            }
            None => {
                drop(guard);
                debug!(hook = %name, "Already shut down, running hook now");
                hook();
            }
        }
    }

    /// Runs every registered hook. Later calls do nothing.
    pub fn run(&self) {
        // Taken out of the lock so hooks may register more hooks.
        let Some(hooks) = self.hooks.lock().take() else {
            return;
        };

        info!(count = hooks.len(), "Running shutdown hooks");
        for (name, hook) in hooks.into_iter().rev() {
            debug!(hook = %name, "Running shutdown hook");
            hook();
        }
    }

    /// Whether the hooks have run.
    pub fn has_run(&self) -> bool {
        self.hooks.lock().is_none()
    }
}

impl Drop for ShutdownHooks {
    fn drop(&mut self) {
        self.run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Hook) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |name: &'static str| -> Hook {
                let log = log.clone();
                Box::new(move || log.lock().push(name))
            }
        };
        (log, make)
    }

    #[test]
    fn test_reverse_order_once() {
        let (log, hook) = recorder();
        let hooks = ShutdownHooks::new();
        hooks.register("first", hook("first"));
        hooks.register("second", hook("second"));

        hooks.run();
        hooks.run();
        assert!(hooks.has_run());
        assert_eq!(*log.lock(), vec!["second", "first"]);
    }

    #[test]
    fn test_runs_on_drop() {
        let (log, hook) = recorder();
        {
            let hooks = ShutdownHooks::new();
            hooks.register("only", hook("only"));
        }
        assert_eq!(*log.lock(), vec!["only"]);
    }

    #[test]
    fn test_late_registration_runs_immediately() {
        let (log, hook) = recorder();
        let hooks = ShutdownHooks::new();
        hooks.run();
        hooks.register("late", hook("late"));
        assert_eq!(*log.lock(), vec!["late"]);
    }
}
