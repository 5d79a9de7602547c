//! Real-time event monitoring
//!
//! An [`EventMonitor`] keeps a registry of handlers and drives a polling loop
//! over a connected [`Device`]. Handlers run one after another on the polling
//! task, typed handlers first and then wildcard handlers, each in
//! registration order. A handler that fails or panics is logged and skipped;
//! the loop keeps going.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zkrust_types::{DeviceEvent, EventKind};

use crate::device::Device;
use crate::error::Result;

type Handler = Arc<dyn Fn(&DeviceEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    typed: HashMap<EventKind, Vec<Handler>>,
    any: Vec<Handler>,
}

impl Registry {
    fn matching(&self, kind: EventKind) -> Vec<Handler> {
        self.typed
            .get(&kind)
            .into_iter()
            .flatten()
            .chain(self.any.iter())
            .cloned()
            .collect()
    }
}

/// Dispatches pushed events to registered handlers
///
/// Clones share the registry and the running flag.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use zkrust::{Device, EventKind, EventMonitor};
///
/// #[tokio::main]
/// async fn main() -> zkrust::Result<()> {
///     let mut device = Device::new("192.168.1.201".parse()?);
///     device.connect().await?;
///
///     let monitor = EventMonitor::new();
///     monitor.on(EventKind::Attendance, |event| {
///         println!("{} punched: {}", event.uid, event);
///         Ok(())
///     });
///
///     monitor.run(&mut device, Duration::from_secs(60)).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct EventMonitor {
    registry: Arc<Mutex<Registry>>,
    running: Arc<AtomicBool>,
    cancel: Arc<Mutex<CancellationToken>>,
}

/// Stops a running monitor from another task
#[derive(Clone)]
pub struct MonitorHandle {
    running: Arc<AtomicBool>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl MonitorHandle {
    /// Ask the current run to stop
    ///
    /// The loop exits at its next wake-up and unregisters from the device.
    pub fn stop(&self) {
        self.cancel.lock().cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl EventMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&DeviceEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry
            .lock()
            .typed
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Register a handler for every event
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&DeviceEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.lock().any.push(Arc::new(handler));
    }

    /// Drop the handlers of one kind, returning how many were removed
    pub fn off(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .typed
            .remove(&kind)
            .map_or(0, |handlers| handlers.len())
    }

    pub fn clear_handlers(&self) {
        let mut registry = self.registry.lock();
        registry.typed.clear();
        registry.any.clear();
    }

    pub fn handler_count(&self) -> usize {
        let registry = self.registry.lock();
        registry.typed.values().map(Vec::len).sum::<usize>() + registry.any.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            running: self.running.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Deliver one event to its handlers
    ///
    /// Returns how many handlers completed without error.
    pub fn dispatch(&self, event: &DeviceEvent) -> usize {
        // Handlers may register more handlers; do not hold the lock while
        // calling them.
        let handlers = self.registry.lock().matching(event.kind);

        let mut ok = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => ok += 1,
                Ok(Err(e)) => warn!(kind = %event.kind, error = %e, "Event handler failed"),
                Err(_) => warn!(kind = %event.kind, "Event handler panicked"),
            }
        }
        ok
    }

    /// Register for events and poll until stopped
    ///
    /// `timeout` of zero means no deadline. Returns `Ok(false)` without
    /// touching the device when this monitor is already running.
    pub async fn run(&self, device: &mut Device, timeout: Duration) -> Result<bool> {
        // Raised under the token lock, so a stop issued once the monitor
        // reads as running always lands on this run's token
        let token = {
            let mut cancel = self.cancel.lock();
            if self.running.swap(true, Ordering::SeqCst) {
                debug!("Monitor already running");
                return Ok(false);
            }
            if cancel.is_cancelled() {
                *cancel = CancellationToken::new();
            }
            cancel.clone()
        };

        let result = self.poll_loop(device, timeout, token).await;
        self.running.store(false, Ordering::SeqCst);
        result.map(|()| true)
    }

    async fn poll_loop(
        &self,
        device: &mut Device,
        timeout: Duration,
        token: CancellationToken,
    ) -> Result<()> {
        let config = device.config().clone();
        device.enable_events(config.event_mask).await?;
        info!("Event monitoring started");

        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let mut delivered = 0usize;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("Monitor deadline reached");
                break;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                datagram = device.poll_datagram(config.poll_wait) => {
                    if let Some(event) = datagram.as_deref().and_then(DeviceEvent::decode) {
                        debug!(%event, "Event received");
                        self.dispatch(&event);
                        delivered += 1;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = sleep(config.poll_interval) => {}
            }
        }

        if let Err(e) = device.disable_events().await {
            warn!(error = %e, "Failed to unregister events");
        }
        info!(delivered, "Event monitoring stopped");
        Ok(())
    }
}

impl Device {
    /// Register for events, collect them for `window`, then unregister
    ///
    /// Returns an empty list when the terminal refuses the registration.
    pub async fn collect_events(&mut self, window: Duration) -> Result<Vec<DeviceEvent>> {
        let config = self.config().clone();
        if let Err(e) = self.enable_events(config.event_mask).await {
            if e.requires_reconnect() {
                return Err(e);
            }
            warn!(error = %e, "Event registration refused");
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + window;
        let mut events = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if let Some(datagram) = self.poll_datagram(remaining.min(config.poll_wait)).await {
                events.extend(DeviceEvent::decode(&datagram));
            } else {
                sleep(remaining.min(config.poll_interval)).await;
            }
        }

        if let Err(e) = self.disable_events().await {
            warn!(error = %e, "Failed to unregister events");
        }
        debug!(count = events.len(), "Collected events");
        Ok(events)
    }
}
