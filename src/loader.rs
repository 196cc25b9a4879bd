// Resolves background sources off the render thread.
// One worker per source; results come back over a channel and the manager
// drains them once per update, so decoding never stalls a frame.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

use log::{debug, warn};

use crate::error::Error;
use crate::media::{self, BackgroundMedia, BackgroundSource};

/// A finished load: the source's position in the list plus the outcome.
pub type LoadResult = (usize, Result<BackgroundMedia, Error>);

pub struct MediaLoader {
    rx: Receiver<LoadResult>,
    pending: usize,
}

impl MediaLoader {
    /// Start decoding every source in the background, sized for a `fit` surface.
    pub fn spawn(sources: &[BackgroundSource], fit: (usize, usize)) -> Self {
        let (tx, rx) = mpsc::channel();

        for (index, source) in sources.iter().cloned().enumerate() {
            let worker_tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("media-loader-{index}"))
                .spawn(move || {
                    let result = media::load(&source, fit, Instant::now());
                    // The manager may already be gone; nobody to tell then.
                    let _ = worker_tx.send((index, result));
                });

            if let Err(e) = spawned {
                warn!("Could not spawn loader for source {index}: {e}");
                let _ = tx.send((
                    index,
                    Err(Error::Decode {
                        location: sources[index].location.clone(),
                        reason: format!("loader thread failed to start: {e}"),
                    }),
                ));
            }
        }

        debug!("Loading {} background source(s)", sources.len());
        Self { rx, pending: sources.len() }
    }

    /// Collect every load that has finished since the last call. Never blocks.
    pub fn try_recv_all(&mut self) -> Vec<LoadResult> {
        let mut done = Vec::new();
        while self.pending > 0 {
            match self.rx.try_recv() {
                Ok(result) => {
                    self.pending -= 1;
                    done.push(result);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Every worker has exited; whatever is missing never arrives.
                    self.pending = 0;
                    break;
                }
            }
        }
        done
    }

    /// Number of sources still being decoded.
    pub fn pending(&self) -> usize {
        self.pending
    }
}
