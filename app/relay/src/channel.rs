use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::warn;

use crate::request::Originator;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Text(String),
    Separator(String),
    Error(String),
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSignal {
    pub originator: Originator,
}

pub type MessageSender = QueueSender<DisplayEvent>;
pub type MessageReceiver = QueueReceiver<DisplayEvent>;
pub type CompletionSender = QueueSender<CompletionSignal>;
pub type CompletionReceiver = QueueReceiver<CompletionSignal>;

/// Unbounded FIFO. Pushing never blocks and works from any thread or task.
pub fn unbounded<T>() -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        QueueSender { tx },
        QueueReceiver {
            rx,
            requeued: VecDeque::new(),
        },
    )
}

#[derive(Debug)]
pub struct QueueSender<T> {
    tx: UnboundedSender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        QueueSender { tx: self.tx.clone() }
    }
}

impl<T> QueueSender<T> {
    pub fn push(&self, item: T) {
        if self.tx.send(item).is_err() {
            warn!("queue consumer is gone, item dropped");
        }
    }
}

#[derive(Debug)]
pub struct QueueReceiver<T> {
    rx: UnboundedReceiver<T>,
    // items handed back by a consumer that could not finish them, served before rx
    requeued: VecDeque<T>,
}

impl<T> QueueReceiver<T> {
    pub fn try_next(&mut self) -> Option<T> {
        if let Some(item) = self.requeued.pop_front() {
            return Some(item);
        }
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Everything queued right now; items pushed while draining wait for the next call.
    pub fn drain(&mut self) -> Vec<T> {
        let available = self.len();
        let mut items = Vec::with_capacity(available);
        while items.len() < available {
            match self.try_next() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        items
    }

    /// Puts items back at the head of the queue, keeping their order.
    pub fn requeue(&mut self, items: Vec<T>) {
        for item in items.into_iter().rev() {
            self.requeued.push_front(item);
        }
    }

    pub fn len(&self) -> usize {
        self.requeued.len() + self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
