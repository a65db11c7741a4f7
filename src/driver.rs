//! Single-consumer channel boundary for a [`TrackSession`].
//!
//! The session runs on a dedicated consumer thread; every handle pushes
//! commands into one FIFO channel. Commands are applied strictly in the order
//! they were queued, so a `stop` sent after a burst of samples observes all of
//! them and nothing queued after it.
//!
//! Dropping every [`SessionHandle`] closes the channel and ends the consumer.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Weak;
use std::thread;

use log::{debug, info};

use crate::error::{OptionExt, Result, TrackError};
use crate::session::{FilterStats, IngestOutcome, SessionObserver, TrackSession, TrackSnapshot};
use crate::Coordinate;

enum Command {
    Start(Sender<Result<()>>),
    Ingest(Coordinate, Option<Sender<Result<IngestOutcome>>>),
    Pause(Sender<Result<()>>),
    Resume(Sender<Result<()>>),
    Stop(Sender<Result<TrackSnapshot>>),
    Snapshot(Sender<TrackSnapshot>),
    Stats(Sender<FilterStats>),
    AddObserver(Weak<dyn SessionObserver>),
    Shutdown(Sender<TrackSession>),
}

/// Cloneable handle to a session running on its consumer thread.
#[derive(Clone)]
pub struct SessionHandle {
    commands: Sender<Command>,
}

/// Move `session` onto a consumer thread and return a handle to it.
pub fn spawn_session(session: TrackSession) -> SessionHandle {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || run(session, rx));
    SessionHandle { commands: tx }
}

fn run(mut session: TrackSession, commands: Receiver<Command>) {
    info!("[SessionDriver] Consumer started");
    for command in commands {
        match command {
            Command::Start(reply) => {
                reply.send(session.start()).ok();
            }
            Command::Ingest(sample, reply) => {
                let outcome = session.ingest(sample);
                if let Some(reply) = reply {
                    reply.send(outcome).ok();
                } else if let Err(e) = outcome {
                    debug!("[SessionDriver] Queued sample dropped: {}", e);
                }
            }
            Command::Pause(reply) => {
                reply.send(session.pause()).ok();
            }
            Command::Resume(reply) => {
                reply.send(session.resume()).ok();
            }
            Command::Stop(reply) => {
                reply.send(session.stop()).ok();
            }
            Command::Snapshot(reply) => {
                reply.send(session.snapshot()).ok();
            }
            Command::Stats(reply) => {
                reply.send(session.stats()).ok();
            }
            Command::AddObserver(observer) => session.add_observer(observer),
            Command::Shutdown(reply) => {
                info!("[SessionDriver] Shutdown requested");
                reply.send(session).ok();
                return;
            }
        }
    }
    info!("[SessionDriver] Channel closed, consumer exiting");
}

impl SessionHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| TrackError::ChannelClosed)
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = mpsc::channel();
        self.send(command(tx))?;
        rx.recv().ok().ok_or_closed()
    }

    pub fn start(&self) -> Result<()> {
        self.request(Command::Start)?
    }

    /// Queue a sample without waiting for the outcome.
    ///
    /// Location callbacks use this; the outcome is visible through observers.
    pub fn push(&self, sample: Coordinate) -> Result<()> {
        self.send(Command::Ingest(sample, None))
    }

    /// Queue a sample and wait for the outcome.
    pub fn ingest(&self, sample: Coordinate) -> Result<IngestOutcome> {
        self.request(|reply| Command::Ingest(sample, Some(reply)))?
    }

    pub fn pause(&self) -> Result<()> {
        self.request(Command::Pause)?
    }

    pub fn resume(&self) -> Result<()> {
        self.request(Command::Resume)?
    }

    /// Stop after every previously queued command and return the final snapshot.
    pub fn stop(&self) -> Result<TrackSnapshot> {
        self.request(Command::Stop)?
    }

    pub fn snapshot(&self) -> Result<TrackSnapshot> {
        self.request(Command::Snapshot)
    }

    pub fn stats(&self) -> Result<FilterStats> {
        self.request(Command::Stats)
    }

    pub fn add_observer(&self, observer: Weak<dyn SessionObserver>) -> Result<()> {
        self.send(Command::AddObserver(observer))
    }

    /// End the consumer and hand the session back. Other clones of the
    /// handle see [`TrackError::ChannelClosed`] afterwards.
    pub fn shutdown(self) -> Result<TrackSession> {
        self.request(Command::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, SessionState, TrackerConfig};
    use std::sync::Arc;

    fn spawn() -> (SessionHandle, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let session = TrackSession::new(TrackerConfig::default(), clock.clone(), Arc::new(|| true));
        (spawn_session(session), clock)
    }

    fn sample(i: i64) -> Coordinate {
        Coordinate::new(48.8566 + i as f64 * 0.0003, 2.3522, i * 5_000)
    }

    #[test]
    fn test_stop_sees_all_queued_samples() {
        let (handle, _) = spawn();
        handle.start().unwrap();
        for i in 0..20 {
            handle.push(sample(i)).unwrap();
        }
        let last = handle.stop().unwrap();
        assert!(last.is_final);
        assert_eq!(last.route.len(), 20);
        // Nothing queued after stop is applied
        assert!(handle.ingest(sample(20)).is_err());
        assert_eq!(handle.snapshot().unwrap().route.len(), 20);
    }

    #[test]
    fn test_ingest_reports_outcome() {
        let (handle, _) = spawn();
        assert!(matches!(
            handle.ingest(sample(0)),
            Err(TrackError::InvalidState { .. })
        ));
        handle.start().unwrap();
        assert!(handle.ingest(sample(0)).unwrap().is_accepted());
        handle.pause().unwrap();
        assert_eq!(handle.ingest(sample(1)).unwrap(), IngestOutcome::Ignored);
        handle.resume().unwrap();
        assert_eq!(handle.stats().unwrap().ignored_while_paused, 1);
    }

    #[test]
    fn test_handles_from_many_threads() {
        let (handle, _) = spawn();
        handle.start().unwrap();

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        // Same point: accepted, zero distance
                        handle.push(Coordinate::new(48.8566, 2.3522, t)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let last = handle.stop().unwrap();
        assert_eq!(last.route.len(), 40);
        assert_eq!(last.metrics.total_distance_m, 0.0);
    }

    #[test]
    fn test_shutdown_closes_channel() {
        let (handle, _) = spawn();
        let other = handle.clone();
        handle.start().unwrap();
        let session = handle.shutdown().unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(other.start(), Err(TrackError::ChannelClosed));
        assert_eq!(other.push(sample(0)), Err(TrackError::ChannelClosed));
    }
}
