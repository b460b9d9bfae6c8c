use futures_util::future::{self, BoxFuture};
use tokio::net::unix::pipe;

use crate::pipes::frame::{read_frame, write_frame, FrameError};

type ReadOutcome = (usize, pipe::Receiver, Result<(Vec<u8>, u32), FrameError>);

fn read_one(id: usize, mut rx: pipe::Receiver) -> BoxFuture<'static, ReadOutcome> {
    Box::pin(async move {
        let result = read_frame(&mut rx).await;
        (id, rx, result)
    })
}

/// Multiplexes reads across every registered pipe and owns the write end
/// of each.
///
/// `receive_any` keeps one in-flight read future per pipe alive across
/// calls via `futures::future::select_all`: whichever pipe becomes ready
/// first is the one call returns, and a fresh read future for that same
/// pipe is immediately requeued. This is the one place the single
/// cooperative worker suspends — no pipe is ever read from more than one
/// future at a time, and nothing here spawns a task.
pub struct PipeRegistry {
    senders: Vec<pipe::Sender>,
    pending: Vec<BoxFuture<'static, ReadOutcome>>,
}

impl PipeRegistry {
    pub fn new(receivers: Vec<pipe::Receiver>, senders: Vec<pipe::Sender>) -> Self {
        let pending =
            receivers.into_iter().enumerate().map(|(id, rx)| read_one(id, rx)).collect();
        Self { senders, pending }
    }

    pub fn pipe_count(&self) -> usize {
        self.senders.len()
    }

    /// Block until any pipe produces a frame, a bad-magic/oversized frame,
    /// or a read error. The error variant carries the offending pipe's
    /// index; that is always fatal to the daemon.
    pub async fn receive_any(&mut self) -> Result<(Vec<u8>, usize, u32), (usize, FrameError)> {
        let pending = std::mem::take(&mut self.pending);
        let ((id, rx, result), _index, mut remaining) = future::select_all(pending).await;
        remaining.push(read_one(id, rx));
        self.pending = remaining;

        match result {
            Ok((payload, priority)) => Ok((payload, id, priority)),
            Err(e) => Err((id, e)),
        }
    }

    /// Send to one pipe. Returns `false` on a closed pipe or unknown index;
    /// the caller logs and continues rather than treating it as fatal.
    pub async fn send(&mut self, pipe_id: usize, payload: &[u8], priority: u32) -> bool {
        match self.senders.get_mut(pipe_id) {
            Some(sender) => write_frame(sender, payload, priority).await.is_ok(),
            None => false,
        }
    }
}
