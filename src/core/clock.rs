//! Fixed-interval clock thread that drives `Engine::tick`.
//!
//! Ticks come from `crossbeam_channel::tick`; a missed deadline is not
//! replayed, the next tick just fires late. Stopping is a message on a
//! separate channel so a stop request is seen between ticks, never mid-tick.

use crossbeam_channel::{Sender, bounded, select, tick};
use log::{debug, info, warn};
use std::io;
use std::thread;
use std::time::Duration;

use super::render::RenderTransform;
use super::scheduler::EngineHandle;

/// Running clock. Dropping it stops the thread.
pub struct Clock {
    stop_tx: Sender<()>,
    handle: Option<thread::JoinHandle<u64>>,
    interval: Duration,
}

impl Clock {
    /// Spawn the clock thread.
    ///
    /// # Arguments
    ///
    /// * `engine` - Shared engine; each tick takes its lock once
    /// * `interval` - Time between ticks
    /// * `limit` - Stop by itself after this many ticks (`None` runs until stopped)
    pub fn start<R>(engine: EngineHandle<R>, interval: Duration, limit: Option<u64>) -> io::Result<Self>
    where
        R: RenderTransform + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticker = tick(interval);

        let handle = thread::Builder::new()
            .name("cuecast-clock".to_string())
            .spawn(move || {
                debug!("Clock started: interval={:?}, limit={:?}", interval, limit);
                let mut ticks = 0u64;

                loop {
                    if limit.is_some_and(|max| ticks >= max) {
                        break;
                    }
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            engine.tick();
                            ticks += 1;
                        }
                    }
                }

                debug!("Clock stopped after {} ticks", ticks);
                ticks
            })?;

        info!("Clock running every {:?}", interval);

        Ok(Self {
            stop_tx,
            handle: Some(handle),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True once the thread has exited (tick limit reached or stopped)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Request a stop. The in-flight tick, if any, completes first.
    pub fn stop(&self) {
        // Full buffer means a stop is already pending
        let _ = self.stop_tx.try_send(());
    }

    /// Wait for the thread to exit and return how many ticks it ran.
    pub fn join(mut self) -> u64 {
        self.join_inner()
    }

    /// Stop and wait
    pub fn shutdown(mut self) -> u64 {
        self.stop();
        self.join_inner()
    }

    fn join_inner(&mut self) -> u64 {
        match self.handle.take().map(|h| h.join()) {
            Some(Ok(ticks)) => ticks,
            Some(Err(_)) => {
                warn!("Clock thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            self.join_inner();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::asset::{AssetData, Rgb};
    use crate::core::render::SnapshotRender;
    use crate::core::scheduler::Engine;

    fn handle() -> EngineHandle<SnapshotRender> {
        EngineHandle::new(Engine::new(&EngineConfig::default(), SnapshotRender))
    }

    #[test]
    fn test_tick_limit() {
        let engine = handle();
        let clock = Clock::start(engine.clone(), Duration::from_millis(1), Some(5)).unwrap();
        assert_eq!(clock.join(), 5);
        assert_eq!(engine.lock().tick_count(), 5);
    }

    #[test]
    fn test_stop_unbounded_clock() {
        let engine = handle();
        let key = engine
            .load_asset(AssetData::new("pulse", vec![Rgb::ZERO, Rgb::new(255, 0, 0)]))
            .unwrap();
        engine.play(&key).unwrap();

        let clock = Clock::start(engine.clone(), Duration::from_millis(1), None).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!clock.is_finished());
        let ticks = clock.shutdown();

        assert!(ticks > 0);
        assert_eq!(engine.lock().tick_count(), ticks);
        assert!(engine.read(&key).is_some());
    }

    #[test]
    fn test_drop_stops_thread() {
        let engine = handle();
        {
            let _clock = Clock::start(engine.clone(), Duration::from_millis(1), None).unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        let after_drop = engine.lock().tick_count();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(engine.lock().tick_count(), after_drop);
    }
}
