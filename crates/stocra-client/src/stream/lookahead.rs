//! The look-ahead block streamer.
//!
//! # Starting
//! Fetch the start block and emit it, then spawn one fetch task per height
//! of the look-ahead window.
//!
//! # Streaming
//! Pending fetches sit in a queue in height order. Only the head gates
//! emission:
//!   - block found: emit it, pop it, schedule the next height after the
//!     highest one scheduled so far
//!   - not mined yet (404): re-spawn the head fetch in place. A fetch that
//!     was issued as the head waits one sleep interval first; a speculative
//!     fetch that went stale before reaching the head is re-issued at once
//!   - anything else: emit the error and terminate
//!
//! # Terminated
//! Nothing more is emitted and every pending task is cancelled.
//!
//! Waiting happens inside the spawned fetch tasks, so dropping a
//! `next_block` future at any await leaves the queue intact and the next
//! call picks up where it stopped.

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use stocra_core::config::StreamConfig;
use stocra_core::error::StocraError;
use stocra_core::request::BlockId;
use stocra_core::types::Block;

use crate::client::Stocra;
use crate::stream::BlockStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Starting,
    Streaming,
    Terminated,
}

type FetchResult = Result<Option<Block>, StocraError>;

struct PendingFetch {
    height: u64,
    handle: JoinHandle<FetchResult>,
    /// Issued while this height was the head of the queue.
    as_head: bool,
}

/// Emits the start block and every later block in strictly increasing
/// height order, keeping `look_ahead_window` fetches in flight.
pub struct LookAhead {
    client: Stocra,
    blockchain: String,
    config: StreamConfig,
    start: Option<BlockId>,
    state: StreamState,
    pending: VecDeque<PendingFetch>,
    highest_scheduled: u64,
    cancel: CancellationToken,
}

impl LookAhead {
    pub(crate) fn new(
        client: Stocra,
        blockchain: &str,
        start: BlockId,
        config: StreamConfig,
    ) -> Result<Self, StocraError> {
        config.validate()?;
        let cancel = client.shutdown_token().child_token();
        Ok(Self {
            client,
            blockchain: blockchain.to_string(),
            config,
            start: Some(start),
            state: StreamState::Starting,
            pending: VecDeque::new(),
            highest_scheduled: 0,
            cancel,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Heights with a fetch in flight or awaiting emission, head first.
    pub fn pending_heights(&self) -> Vec<u64> {
        self.pending.iter().map(|p| p.height).collect()
    }

    /// The next block, or `None` once the stream has terminated.
    ///
    /// After an error is returned every later call returns `None`.
    pub async fn next_block(&mut self) -> Option<Result<Block, StocraError>> {
        match self.state {
            StreamState::Terminated => None,
            StreamState::Starting => Some(self.start().await),
            StreamState::Streaming => Some(self.advance().await),
        }
    }

    /// Wrap the state machine as a [`futures::Stream`].
    pub fn into_stream(self) -> BlockStream {
        stream::unfold(self, |mut look_ahead| async move {
            let item = look_ahead.next_block().await?;
            Some((item, look_ahead))
        })
        .boxed()
    }

    async fn start(&mut self) -> Result<Block, StocraError> {
        let start = self.start.clone().unwrap_or_default();
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => Err(StocraError::Cancelled),
            res = self.client.get_block(&self.blockchain, start) => res,
        };
        self.start = None;
        let block = match fetched {
            Ok(block) => block,
            Err(e) => return Err(self.terminate(e)),
        };

        self.highest_scheduled = block.height();
        for _ in 0..self.config.look_ahead_window {
            self.schedule_next();
        }
        self.state = StreamState::Streaming;
        tracing::info!(
            blockchain = %self.blockchain,
            height = block.height(),
            window = self.config.look_ahead_window,
            "block stream started"
        );
        Ok(block)
    }

    async fn advance(&mut self) -> Result<Block, StocraError> {
        loop {
            let Some(head) = self.pending.front_mut() else {
                self.schedule_next();
                continue;
            };
            let (height, as_head) = (head.height, head.as_head);
            let joined = (&mut head.handle).await;

            match joined {
                Ok(Ok(Some(block))) => {
                    self.pending.pop_front();
                    self.schedule_next();
                    tracing::debug!(blockchain = %self.blockchain, height, "block emitted");
                    return Ok(block);
                }
                Ok(Ok(None)) => {
                    let delay = if as_head {
                        self.config.sleep_interval()
                    } else {
                        Duration::ZERO
                    };
                    tracing::debug!(
                        blockchain = %self.blockchain,
                        height,
                        delay_ms = delay.as_millis() as u64,
                        "block not mined yet"
                    );
                    let handle = self.spawn_fetch(height, delay);
                    if let Some(head) = self.pending.front_mut() {
                        head.handle = handle;
                        head.as_head = true;
                    }
                }
                Ok(Err(e)) => return Err(self.terminate(e)),
                Err(join) if join.is_cancelled() => {
                    return Err(self.terminate(StocraError::Cancelled));
                }
                Err(join) => return Err(self.terminate(StocraError::Task(join.to_string()))),
            }
        }
    }

    fn schedule_next(&mut self) {
        self.highest_scheduled += 1;
        let height = self.highest_scheduled;
        let as_head = self.pending.is_empty();
        let handle = self.spawn_fetch(height, Duration::ZERO);
        self.pending.push_back(PendingFetch {
            height,
            handle,
            as_head,
        });
    }

    /// Poll `height` after `delay`, unless the stream is cancelled first.
    fn spawn_fetch(&self, height: u64, delay: Duration) -> JoinHandle<FetchResult> {
        let client = self.client.clone();
        let blockchain = self.blockchain.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let poll = async {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                client.poll_block(&blockchain, height).await
            };
            tokio::select! {
                _ = cancel.cancelled() => Err(StocraError::Cancelled),
                res = poll => res,
            }
        })
    }

    fn terminate(&mut self, error: StocraError) -> StocraError {
        self.state = StreamState::Terminated;
        self.cancel.cancel();
        for pending in self.pending.drain(..) {
            pending.handle.abort();
        }
        tracing::info!(blockchain = %self.blockchain, %error, "block stream terminated");
        error
    }
}

impl Drop for LookAhead {
    fn drop(&mut self) {
        self.cancel.cancel();
        for pending in &self.pending {
            pending.handle.abort();
        }
    }
}

impl std::fmt::Debug for LookAhead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookAhead")
            .field("blockchain", &self.blockchain)
            .field("state", &self.state)
            .field("pending", &self.pending_heights())
            .finish()
    }
}
