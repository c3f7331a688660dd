//! Double-buffered link: a worker thread owns the blocking transport.
//!
//! The control side never touches I/O. Force commands go to the worker
//! over a channel and are coalesced to the newest one. Telemetry comes
//! back through a single slot the worker overwrites, so an idle control
//! side never builds a backlog. Send failures seen by the worker are
//! reported on the next [`send_tool_force`](RobotLink::send_tool_force)
//! call.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LinkError;

use super::RobotLink;

/// Worker timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// How often the worker polls telemetry when no command arrives.
    pub poll_interval_us: u64,
    /// Telemetry older than this is treated as missing.
    pub stale_after_ms: u64,
    /// How long enable, disable and flush wait for the worker.
    pub ack_timeout_ms: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: 1000,
            stale_after_ms: 100,
            ack_timeout_ms: 250,
        }
    }
}

impl BufferConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us.max(1))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

type Ack = Sender<Result<(), LinkError>>;

enum Command {
    Force(Vec3),
    Enable(Ack),
    Disable(Ack),
    Flush(Ack),
    Stop,
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    position: Vec3,
    velocity: Option<Vec3>,
    taken_at: Instant,
}

/// Newest telemetry sample, overwritten by the worker.
type TelemetrySlot = Arc<Mutex<Option<Snapshot>>>;

/// Non-blocking wrapper around any [`RobotLink`].
///
/// Position and velocity always come from one worker sample: use
/// [`telemetry`](RobotLink::telemetry), or call `tool_position` then
/// `tool_velocity`, which reads the velocity of the sample the position
/// came from.
pub struct BufferedLink<L: RobotLink + Send + 'static> {
    commands: Sender<Command>,
    failures: Receiver<LinkError>,
    slot: TelemetrySlot,
    latest: Option<Snapshot>,
    current: Option<Snapshot>,
    pending_failure: Option<LinkError>,
    config: BufferConfig,
    worker: Option<JoinHandle<L>>,
}

impl<L: RobotLink + Send + 'static> BufferedLink<L> {
    /// Move `link` onto a worker thread.
    pub fn spawn(link: L, config: BufferConfig) -> Result<Self, LinkError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (failure_tx, failure_rx) = mpsc::channel();
        let slot = TelemetrySlot::default();
        let worker_slot = Arc::clone(&slot);
        let poll_interval = config.poll_interval();

        let worker = thread::Builder::new()
            .name("robot-link".into())
            .spawn(move || run_worker(link, command_rx, failure_tx, worker_slot, poll_interval))
            .map_err(|e| LinkError::Activation(format!("failed to spawn link worker: {e}")))?;

        Ok(Self {
            commands: command_tx,
            failures: failure_rx,
            slot,
            latest: None,
            current: None,
            pending_failure: None,
            config,
            worker: Some(worker),
        })
    }

    /// Stop the worker and hand back the wrapped link.
    pub fn into_inner(mut self) -> Option<L> {
        let _ = self.commands.send(Command::Stop);
        self.worker.take().and_then(|w| w.join().ok())
    }

    fn drain_failures(&mut self) {
        while let Ok(e) = self.failures.try_recv() {
            self.pending_failure = Some(e);
        }
    }

    /// Take the newest sample from the slot and cache it for this read.
    ///
    /// Never waits on the worker: if the slot is being written, the
    /// previous sample is used.
    fn refresh(&mut self) -> Option<Snapshot> {
        match self.slot.try_lock() {
            Ok(slot) => self.latest = (*slot).or(self.latest),
            Err(TryLockError::Poisoned(poisoned)) => {
                self.latest = (*poisoned.into_inner()).or(self.latest);
            }
            Err(TryLockError::WouldBlock) => {}
        }
        let stale_after = self.config.stale_after();
        self.current = self.latest.filter(|s| s.taken_at.elapsed() <= stale_after);
        self.current
    }

    fn round_trip(&mut self, make: impl FnOnce(Ack) -> Command) -> Result<(), LinkError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.commands
            .send(make(ack_tx))
            .map_err(|_| LinkError::Disconnected)?;
        let timeout = self.config.ack_timeout();
        match ack_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(LinkError::FlushTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Disconnected),
        }
    }
}

impl<L: RobotLink + Send + 'static> RobotLink for BufferedLink<L> {
    fn tool_position(&mut self) -> Option<Vec3> {
        self.refresh().map(|s| s.position)
    }

    /// Velocity of the sample the last `tool_position` read; a fresh
    /// sample otherwise.
    fn tool_velocity(&mut self) -> Option<Vec3> {
        match self.current.take() {
            Some(snapshot) => snapshot.velocity,
            None => self.refresh().and_then(|s| s.velocity),
        }
    }

    fn telemetry(&mut self) -> Option<(Vec3, Option<Vec3>)> {
        let snapshot = self.refresh()?;
        self.current = None;
        Some((snapshot.position, snapshot.velocity))
    }

    fn send_tool_force(&mut self, force: Vec3) -> Result<(), LinkError> {
        self.drain_failures();
        self.commands
            .send(Command::Force(force))
            .map_err(|_| LinkError::Disconnected)?;
        match self.pending_failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn enable(&mut self) -> Result<(), LinkError> {
        self.round_trip(Command::Enable)
    }

    fn disable(&mut self) -> Result<(), LinkError> {
        self.round_trip(Command::Disable)
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        self.round_trip(Command::Flush)?;
        self.drain_failures();
        match self.pending_failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<L: RobotLink + Send + 'static> Drop for BufferedLink<L> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(Command::Stop);
            if worker.join().is_err() {
                warn!("robot link worker panicked");
            }
        }
    }
}

fn run_worker<L: RobotLink>(
    mut link: L,
    commands: Receiver<Command>,
    failures: Sender<LinkError>,
    slot: TelemetrySlot,
    poll_interval: Duration,
) -> L {
    debug!("robot link worker started");
    'outer: loop {
        let first = match commands.recv_timeout(poll_interval) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        // Only the newest force in a burst reaches the arm; control
        // commands are applied in order after any force queued before them.
        let mut pending_force = None;
        for command in first.into_iter().chain(commands.try_iter()) {
            match command {
                Command::Force(force) => pending_force = Some(force),
                Command::Enable(ack) => {
                    send_pending(&mut link, &mut pending_force, &failures);
                    let _ = ack.send(link.enable());
                }
                Command::Disable(ack) => {
                    send_pending(&mut link, &mut pending_force, &failures);
                    let _ = ack.send(link.disable());
                }
                Command::Flush(ack) => {
                    send_pending(&mut link, &mut pending_force, &failures);
                    let _ = ack.send(link.flush());
                }
                Command::Stop => {
                    send_pending(&mut link, &mut pending_force, &failures);
                    break 'outer;
                }
            }
        }
        send_pending(&mut link, &mut pending_force, &failures);

        if let Some((position, velocity)) = link.telemetry() {
            let snapshot = Snapshot {
                position,
                velocity,
                taken_at: Instant::now(),
            };
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        }
    }
    debug!("robot link worker stopped");
    link
}

fn send_pending<L: RobotLink>(
    link: &mut L,
    pending_force: &mut Option<Vec3>,
    failures: &Sender<LinkError>,
) {
    if let Some(force) = pending_force.take() {
        if let Err(e) = link.send_tool_force(force) {
            let _ = failures.send(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::controller::{HapticController, SafetyConfig, TelemetryConfig};
    use crate::haptics::HapticShape;
    use crate::link::RecordingLink;
    use crate::transform::FrameTransform;

    fn wait_for_position<L: RobotLink + Send + 'static>(link: &mut BufferedLink<L>) -> Option<Vec3> {
        for _ in 0..400 {
            if let Some(p) = link.tool_position() {
                return Some(p);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    /// Every poll is a new sample `n` with position and velocity both
    /// `splat(n)`.
    struct CountingLink {
        polls: Arc<AtomicU32>,
    }

    impl RobotLink for CountingLink {
        fn tool_position(&mut self) -> Option<Vec3> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            Some(Vec3::splat(n as f32))
        }

        fn tool_velocity(&mut self) -> Option<Vec3> {
            Some(Vec3::splat(self.polls.load(Ordering::SeqCst) as f32))
        }

        fn send_tool_force(&mut self, _force: Vec3) -> Result<(), LinkError> {
            Ok(())
        }
    }

    /// Telemetry the test can switch off and forces it can inspect while
    /// the worker owns the link.
    #[derive(Clone, Default)]
    struct SharedLink {
        position: Arc<Mutex<Option<Vec3>>>,
        sent: Arc<Mutex<Vec<Vec3>>>,
    }

    impl SharedLink {
        fn set_position(&self, position: Option<Vec3>) {
            *self.position.lock().unwrap() = position;
        }

        fn last_sent(&self) -> Option<Vec3> {
            self.sent.lock().unwrap().last().copied()
        }
    }

    impl RobotLink for SharedLink {
        fn tool_position(&mut self) -> Option<Vec3> {
            *self.position.lock().unwrap()
        }

        fn tool_velocity(&mut self) -> Option<Vec3> {
            self.tool_position().map(|_| Vec3::ZERO)
        }

        fn send_tool_force(&mut self, force: Vec3) -> Result<(), LinkError> {
            self.sent.lock().unwrap().push(force);
            Ok(())
        }
    }

    fn quick_stale() -> BufferConfig {
        BufferConfig {
            stale_after_ms: 10,
            ..BufferConfig::default()
        }
    }

    #[test]
    fn test_telemetry_arrives() {
        let inner = RecordingLink::with_telemetry(Vec3::new(0.1, 0.2, 0.3), Vec3::X);
        let mut link = BufferedLink::spawn(inner, BufferConfig::default()).unwrap();
        assert_eq!(wait_for_position(&mut link), Some(Vec3::new(0.1, 0.2, 0.3)));
        assert_eq!(link.tool_velocity(), Some(Vec3::X));
        assert_eq!(link.telemetry(), Some((Vec3::new(0.1, 0.2, 0.3), Some(Vec3::X))));
    }

    #[test]
    fn test_no_telemetry_reads_none() {
        let mut link = BufferedLink::spawn(RecordingLink::new(), BufferConfig::default()).unwrap();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(link.tool_position(), None);
        assert_eq!(link.tool_velocity(), None);
        assert_eq!(link.telemetry(), None);
    }

    #[test]
    fn test_position_and_velocity_share_a_sample() {
        let polls = Arc::new(AtomicU32::new(0));
        let inner = CountingLink {
            polls: Arc::clone(&polls),
        };
        let mut link = BufferedLink::spawn(inner, BufferConfig::default()).unwrap();

        let position = wait_for_position(&mut link).unwrap();
        // Let the worker publish several newer samples in between.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(link.tool_velocity(), Some(position));

        let (position, velocity) = link.telemetry().unwrap();
        assert_eq!(velocity, Some(position));
        assert!(position.x > 1.0);
    }

    #[test]
    fn test_reads_newest_sample_after_idle() {
        let polls = Arc::new(AtomicU32::new(0));
        let inner = CountingLink {
            polls: Arc::clone(&polls),
        };
        let mut link = BufferedLink::spawn(inner, BufferConfig::default()).unwrap();

        thread::sleep(Duration::from_millis(60));
        let position = link.tool_position().unwrap();
        let newest = polls.load(Ordering::SeqCst) as f32;
        assert!(position.x >= 10.0, "position = {position}");
        assert!(newest - position.x <= 5.0, "read {} of {newest}", position.x);
    }

    #[test]
    fn test_stale_telemetry_reads_none() {
        let inner = SharedLink::default();
        inner.set_position(Some(Vec3::X));
        let mut link = BufferedLink::spawn(inner.clone(), quick_stale()).unwrap();
        assert_eq!(wait_for_position(&mut link), Some(Vec3::X));

        // Worker keeps polling but has nothing new to publish.
        inner.set_position(None);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(link.tool_position(), None);
        assert_eq!(link.tool_velocity(), None);
        assert_eq!(link.telemetry(), None);

        inner.set_position(Some(Vec3::Y));
        assert_eq!(wait_for_position(&mut link), Some(Vec3::Y));
    }

    #[test]
    fn test_stale_telemetry_commands_zero() {
        let inner = SharedLink::default();
        inner.set_position(Some(Vec3::X));
        let link = BufferedLink::spawn(inner.clone(), quick_stale()).unwrap();
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0).unwrap();
        let mut controller = HapticController::new(
            link,
            vec![sphere],
            FrameTransform::identity(),
            TelemetryConfig {
                probe_radius: 0.5,
                velocity_cutoff: None,
            },
            SafetyConfig::default(),
        )
        .unwrap();

        assert!(wait_for_position(controller.link_mut()).is_some());
        let report = controller.tick(0.004);
        assert!(report.telemetry_valid);
        assert!(report.command.length() > 0.0);

        inner.set_position(None);
        thread::sleep(Duration::from_millis(40));
        let report = controller.tick(0.004);
        assert!(!report.telemetry_valid);
        assert_eq!(report.command, Vec3::ZERO);

        controller.link_mut().flush().unwrap();
        assert_eq!(inner.last_sent(), Some(Vec3::ZERO));
    }

    #[test]
    fn test_newest_force_wins() {
        let mut link = BufferedLink::spawn(RecordingLink::new(), BufferConfig::default()).unwrap();
        for i in 0..50 {
            link.send_tool_force(Vec3::splat(i as f32)).unwrap();
        }
        link.flush().unwrap();

        let inner = link.into_inner().unwrap();
        assert!(!inner.sent.is_empty() && inner.sent.len() <= 50);
        assert_eq!(inner.last_sent(), Some(Vec3::splat(49.0)));
        assert_eq!(inner.flush_count, 1);
    }

    #[test]
    fn test_failure_reported_later() {
        let inner = RecordingLink {
            fail_sends: 1,
            ..RecordingLink::default()
        };
        let mut link = BufferedLink::spawn(inner, BufferConfig::default()).unwrap();
        // Accepted into the buffer; the worker fails it.
        assert!(link.send_tool_force(Vec3::X).is_ok());
        assert!(matches!(link.flush(), Err(LinkError::SendFailed(_))));
        assert!(link.send_tool_force(Vec3::Y).is_ok());
        link.flush().unwrap();
        assert_eq!(link.into_inner().unwrap().sent, vec![Vec3::Y]);
    }

    #[test]
    fn test_enable_disable_forwarded() {
        let mut link = BufferedLink::spawn(RecordingLink::new(), BufferConfig::default()).unwrap();
        link.enable().unwrap();
        let inner = link.into_inner().unwrap();
        assert!(inner.enabled);
    }
}
