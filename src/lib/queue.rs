//! Bounded FIFO between transfer submitters and the sequencer.

use tokio::sync::{mpsc, oneshot};

use crate::domain::transfer::Transfer;
use crate::sequencer::{SequencerError, TransferReceipt};

/// Outcome the sequencer reports back for one transfer.
pub type Reply = Result<TransferReceipt, SequencerError>;

/// A transfer waiting in the queue together with its reply channel.
#[derive(Debug)]
pub struct QueuedTransfer {
    pub transfer: Transfer,
    pub reply: oneshot::Sender<Reply>,
}

impl QueuedTransfer {
    /// Deliver the outcome. A submitter that stopped listening is not an error.
    pub fn respond(self, outcome: Reply) {
        let _ = self.reply.send(outcome);
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    #[error("transfer queue is closed")]
    QueueClosed,

    #[error("transfer queue is full")]
    QueueFull,

    #[error("sequencer dropped the transfer without replying")]
    Dropped,

    #[error("transfer rejected: {0}")]
    Rejected(#[from] SequencerError),
}

/// Create a queue holding at most `capacity` pending transfers.
///
/// A capacity of 0 is treated as 1.
pub fn transfer_queue(capacity: usize) -> (QueueHandle, TransferQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueHandle { tx }, TransferQueue { rx })
}

/// Producer side of the queue.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<QueuedTransfer>,
}

impl QueueHandle {
    fn entry(transfer: Transfer) -> (QueuedTransfer, Submission) {
        let (reply, rx) = oneshot::channel();
        (QueuedTransfer { transfer, reply }, Submission { rx })
    }

    /// Enqueue, waiting for a free slot if the queue is full.
    pub async fn submit(&self, transfer: Transfer) -> Result<Submission, SubmitError> {
        let (entry, submission) = Self::entry(transfer);
        self.tx
            .send(entry)
            .await
            .map_err(|_| SubmitError::QueueClosed)?;
        Ok(submission)
    }

    /// Enqueue without waiting.
    pub fn try_submit(&self, transfer: Transfer) -> Result<Submission, SubmitError> {
        let (entry, submission) = Self::entry(transfer);
        self.tx.try_send(entry).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::QueueClosed,
        })?;
        Ok(submission)
    }

    /// Enqueue from synchronous code, blocking the thread while the queue is full.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_submit(&self, transfer: Transfer) -> Result<Submission, SubmitError> {
        let (entry, submission) = Self::entry(transfer);
        self.tx
            .blocking_send(entry)
            .map_err(|_| SubmitError::QueueClosed)?;
        Ok(submission)
    }

    /// Submit and wait until the sequencer has processed the transfer.
    pub async fn submit_and_wait(&self, transfer: Transfer) -> Result<TransferReceipt, SubmitError> {
        self.submit(transfer).await?.outcome().await
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Pending reply for a submitted transfer.
#[derive(Debug)]
pub struct Submission {
    rx: oneshot::Receiver<Reply>,
}

impl Submission {
    pub async fn outcome(self) -> Result<TransferReceipt, SubmitError> {
        match self.rx.await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(e)) => Err(SubmitError::Rejected(e)),
            Err(_) => Err(SubmitError::Dropped),
        }
    }
}

/// Consumer side of the queue.
#[derive(Debug)]
pub struct TransferQueue {
    rx: mpsc::Receiver<QueuedTransfer>,
}

impl TransferQueue {
    /// Next transfer in FIFO order; waits while the queue is empty.
    ///
    /// Returns `None` once every handle is dropped (or the queue is closed)
    /// and the remaining transfers have been drained.
    pub async fn dequeue(&mut self) -> Option<QueuedTransfer> {
        self.rx.recv().await
    }

    /// Refuse new submissions; already queued transfers can still be dequeued.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
