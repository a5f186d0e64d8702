//! Event loop tying watches, debouncing, scanning and hooks together
//!
//! Open and close events never decide the state themselves: they only
//! schedule a debounced rescan of the process table, and the scan result
//! picks the hook. Creation events re-arm the device watch.

use crate::backend::{FsEvent, WatchBackend};
use crate::debounce::Debouncer;
use crate::error::WatchError;
use crate::registrar::{WatchRegistrar, DEVICE_MASK};
use crate::scanner::{ProcessScanner, ProcessSource};
use async_trait::async_trait;
use camwatch_core::{HookAction, Presence};
use futures::{Stream, StreamExt};
use inotify::EventMask;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Receiver of presence transitions
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Called once per settled scan with the resulting action
    ///
    /// Implementations handle their own failures.
    async fn fire(&self, action: HookAction);
}

/// Lifecycle of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Watches not yet placed
    Initializing,
    /// Directory and device watches in place, consuming events
    Watching,
}

/// Device presence monitor
pub struct Monitor<B, S> {
    registrar: WatchRegistrar<B>,
    scanner: Arc<ProcessScanner<S>>,
    hooks: Arc<dyn Hooks>,
    debouncer: Debouncer,
    /// Held across scan and hook so firings never overlap
    firing: Arc<tokio::sync::Mutex<()>>,
    state: MonitorState,
}

impl<B, S> Monitor<B, S>
where
    B: WatchBackend,
    S: ProcessSource + 'static,
{
    pub fn new(
        registrar: WatchRegistrar<B>,
        scanner: ProcessScanner<S>,
        hooks: Arc<dyn Hooks>,
        debounce: Duration,
    ) -> Self {
        Self {
            registrar,
            scanner: Arc::new(scanner),
            hooks,
            debouncer: Debouncer::new(debounce),
            firing: Arc::new(tokio::sync::Mutex::new(())),
            state: MonitorState::Initializing,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Place the initial watches and schedule the first scan
    ///
    /// Errors here are fatal. Calling again once watching is a no-op.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.state == MonitorState::Watching {
            return Ok(());
        }

        let devices = self.registrar.initialize()?;
        info!(
            directory = %self.registrar.class().dir().display(),
            devices,
            "Watching for video devices."
        );

        self.state = MonitorState::Watching;
        self.schedule_rescan();
        Ok(())
    }

    /// Run until the event stream ends or `shutdown` resolves
    ///
    /// Stream errors are logged and do not stop the loop.
    pub async fn run<E, F>(mut self, events: E, shutdown: F) -> Result<(), WatchError>
    where
        E: Stream<Item = io::Result<FsEvent>>,
        F: Future<Output = ()>,
    {
        self.start()?;

        let mut events = std::pin::pin!(events);
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down.");
                    break;
                }
                next = events.next() => match next {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(e)) => error!(error = %e, "Watch error."),
                    None => {
                        warn!("Watch event stream ended.");
                        break;
                    }
                },
            }
        }

        self.debouncer.cancel();
        Ok(())
    }

    /// Dispatch one event by kind
    ///
    /// Kinds are checked independently; one event may both close and open.
    pub async fn handle_event(&mut self, event: FsEvent) {
        let FsEvent { path, mask } = event;
        let device = path.as_deref().map(|p| p.display().to_string()).unwrap_or_default();

        if mask.contains(EventMask::Q_OVERFLOW) {
            warn!("Event queue overflowed, rescanning.");
            self.schedule_rescan();
        }

        if mask.contains(EventMask::OPEN) {
            info!(device = %device, mask = ?mask, "Device opened.");
            self.schedule_rescan();
        }

        if mask.intersects(EventMask::CLOSE_WRITE | EventMask::CLOSE_NOWRITE) {
            info!(device = %device, mask = ?mask, "Device closed.");
            self.schedule_rescan();
        }

        if mask.contains(EventMask::IGNORED) {
            debug!(device = %device, "Watch removed.");
        }

        if mask.contains(EventMask::CREATE) {
            if let Some(path) = path.filter(|p| self.registrar.class().is_video_device(p)) {
                info!(device = %path.display(), "Device detected.");
                self.registrar.rearm(&path, DEVICE_MASK).await;
            }
        }
    }

    /// Debounced rescan followed by the matching hook
    ///
    /// A window that elapses while an earlier hook is still running waits
    /// for it, then scans the process table afresh.
    fn schedule_rescan(&self) {
        let scanner = Arc::clone(&self.scanner);
        let hooks = Arc::clone(&self.hooks);
        let firing = Arc::clone(&self.firing);

        self.debouncer.trigger(async move {
            let _firing = firing.lock().await;
            let presence = match tokio::task::spawn_blocking(move || scanner.presence()).await {
                Ok(presence) => presence,
                Err(e) => {
                    error!(error = %e, "Process scan task failed, assuming devices are closed.");
                    Presence::Closed
                }
            };
            hooks.fire(presence.action()).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::registrar::RetryPolicy;
    use crate::scanner::{Descriptors, Pids};
    use camwatch_core::DeviceClass;
    use inotify::WatchMask;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct NullBackend;

    impl WatchBackend for NullBackend {
        fn add_watch(&mut self, _path: &Path, _mask: WatchMask) -> io::Result<()> {
            Ok(())
        }

        fn remove_watch(&mut self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    /// Process table whose single holder can be swapped at runtime
    #[derive(Clone, Default)]
    struct SwitchTable(Arc<Mutex<Option<PathBuf>>>);

    impl ProcessSource for SwitchTable {
        fn pids(&self) -> Result<Pids<'_>, ScanError> {
            Ok(Box::new(std::iter::once(1)))
        }

        fn descriptors(&self, _pid: u32) -> io::Result<Descriptors<'_>> {
            Ok(Box::new(self.0.lock().clone().map(Ok::<_, io::Error>).into_iter()))
        }
    }

    struct ChannelHooks(mpsc::UnboundedSender<HookAction>);

    #[async_trait]
    impl Hooks for ChannelHooks {
        async fn fire(&self, action: HookAction) {
            let _ = self.0.send(action);
        }
    }

    fn monitor(
        dir: &Path,
        table: SwitchTable,
    ) -> (Monitor<NullBackend, SwitchTable>, mpsc::UnboundedReceiver<HookAction>) {
        let class = DeviceClass::new(dir, "video");
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Monitor::new(
            WatchRegistrar::new(NullBackend, class.clone(), RetryPolicy::default()),
            ProcessScanner::new(table, class),
            Arc::new(ChannelHooks(tx)),
            Duration::from_millis(500),
        );
        (monitor, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_transitions_to_watching() {
        let temp_dir = TempDir::new().unwrap();
        let (mut monitor, mut rx) = monitor(temp_dir.path(), SwitchTable::default());

        assert_eq!(monitor.state(), MonitorState::Initializing);
        monitor.start().unwrap();
        assert_eq!(monitor.state(), MonitorState::Watching);

        assert_eq!(rx.recv().await, Some(HookAction::Close));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fails_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        let (mut monitor, _rx) = monitor(&temp_dir.path().join("gone"), SwitchTable::default());

        assert!(monitor.start().is_err());
        assert_eq!(monitor.state(), MonitorState::Initializing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_combined_mask_rescans_once() {
        let temp_dir = TempDir::new().unwrap();
        let table = SwitchTable::default();
        let (mut monitor, mut rx) = monitor(temp_dir.path(), table.clone());
        monitor.start().unwrap();
        assert_eq!(rx.recv().await, Some(HookAction::Close));

        *table.0.lock() = Some(temp_dir.path().join("video0"));
        monitor
            .handle_event(FsEvent::new(
                temp_dir.path().join("video0"),
                EventMask::OPEN | EventMask::CLOSE_NOWRITE,
            ))
            .await;

        assert_eq!(rx.recv().await, Some(HookAction::Open));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_triggers_rescan() {
        let temp_dir = TempDir::new().unwrap();
        let (mut monitor, mut rx) = monitor(temp_dir.path(), SwitchTable::default());
        monitor.start().unwrap();
        assert_eq!(rx.recv().await, Some(HookAction::Close));

        monitor
            .handle_event(FsEvent {
                path: None,
                mask: EventMask::Q_OVERFLOW,
            })
            .await;
        assert_eq!(rx.recv().await, Some(HookAction::Close));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let (monitor, _rx) = monitor(temp_dir.path(), SwitchTable::default());

        let events = futures::stream::pending::<io::Result<FsEvent>>();
        let result = monitor
            .run(events, tokio::time::sleep(Duration::from_secs(1)))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_stream_errors() {
        let temp_dir = TempDir::new().unwrap();
        let (monitor, mut rx) = monitor(temp_dir.path(), SwitchTable::default());

        let events = futures::stream::iter(vec![
            Err(io::Error::new(io::ErrorKind::Other, "read failed")),
            Ok(FsEvent::new(temp_dir.path().join("video0"), EventMask::CLOSE_WRITE)),
        ])
        .chain(futures::stream::pending());
        let started = tokio::time::Instant::now();
        let task = tokio::spawn(monitor.run(events, tokio::time::sleep(Duration::from_secs(5))));

        // The close after the error still settles before shutdown
        assert_eq!(rx.recv().await, Some(HookAction::Close));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!task.is_finished());

        task.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    /// Hooks that take a while and track how many run at once
    #[derive(Default)]
    struct SlowHooks {
        running: AtomicUsize,
        peak: AtomicUsize,
        fired: AtomicUsize,
    }

    #[async_trait]
    impl Hooks for SlowHooks {
        async fn fire(&self, _action: HookAction) {
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(2)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_fires_never_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let class = DeviceClass::new(temp_dir.path(), "video");
        let hooks = Arc::new(SlowHooks::default());
        let mut monitor = Monitor::new(
            WatchRegistrar::new(NullBackend, class.clone(), RetryPolicy::default()),
            ProcessScanner::new(SwitchTable::default(), class),
            Arc::clone(&hooks) as Arc<dyn Hooks>,
            Duration::from_millis(500),
        );
        monitor.start().unwrap();

        // Startup hook is mid-flight when the next window elapses
        tokio::time::sleep(Duration::from_millis(700)).await;
        monitor
            .handle_event(FsEvent::new(
                temp_dir.path().join("video0"),
                EventMask::CLOSE_NOWRITE,
            ))
            .await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(hooks.fired.load(Ordering::SeqCst), 2);
        assert_eq!(hooks.peak.load(Ordering::SeqCst), 1);
    }
}
