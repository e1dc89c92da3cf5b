// THEORY:
// The `worker` runs perception next to actuation instead of inside its loop. A
// session is moved onto a blocking tokio task that repeats snap -> release at a
// fixed interval. The session keeps being the sole writer of the result; the
// control loop holds a `ResultReader` and, if it wants to react to every frame,
// waits on the frame-number watch channel.
//
// The worker is the caller that owns retry policy: a failed capture is logged and
// the loop simply tries again on the next tick.

use crate::camera::CameraSource;
use crate::error::VisionError;
use crate::result::ResultReader;
use crate::session::PerceptionSession;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct PerceptionWorker<C: CameraSource + 'static> {
    handle: JoinHandle<PerceptionSession<C>>,
    stop: Arc<AtomicBool>,
    frames: watch::Receiver<u64>,
    reader: ResultReader,
}

impl<C: CameraSource + 'static> PerceptionWorker<C> {
    /// Starts the loop on the blocking pool. The session must already be initialized.
    pub fn spawn(mut session: PerceptionSession<C>, interval: Duration) -> Self {
        let reader = session.reader();
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, frames) = watch::channel(session.frame_number());

        let stop_flag = Arc::clone(&stop);
        let handle = tokio::task::spawn_blocking(move || {
            info!("Perception worker started ({:?} interval)", interval);
            while !stop_flag.load(Ordering::Acquire) {
                match session.snap() {
                    Ok(outcome) => {
                        if !outcome.is_complete() {
                            warn!("Frame {} degraded", session.frame_number());
                        }
                        session.release();
                        // Nobody listening is fine; the reader still sees the commit.
                        let _ = tx.send(session.frame_number());
                    }
                    Err(e) => {
                        debug!("Worker snap failed: {}", e);
                        session.release();
                    }
                }
                if !interval.is_zero() {
                    std::thread::sleep(interval);
                }
            }
            info!("Perception worker stopped after frame {}", session.frame_number());
            session
        });

        Self {
            handle,
            stop,
            frames,
            reader,
        }
    }

    /// Waits for the next committed frame and returns its frame number.
    pub async fn changed(&mut self) -> Result<u64, VisionError> {
        self.frames
            .changed()
            .await
            .map_err(|_| VisionError::Worker("Perception worker has stopped".to_string()))?;
        Ok(*self.frames.borrow_and_update())
    }

    /// Latest committed frame number.
    pub fn latest_frame(&self) -> u64 {
        *self.frames.borrow()
    }

    pub fn reader(&self) -> ResultReader {
        self.reader.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the loop after the current frame and hands the session back.
    pub async fn shutdown(self) -> Result<PerceptionSession<C>, VisionError> {
        self.stop.store(true, Ordering::Release);
        Ok(self.handle.await?)
    }
}
