//! Single-consumer queue between the sync layer and the engines.
//!
//! Producers may live on any thread and hold a cloned [`InboxSender`]. The
//! [`Inbox`] itself is owned by whoever mutates the registry, which then
//! drains it one record at a time.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::record::InboundRecord;

/// Cloneable producer handle.
#[derive(Debug, Clone)]
pub struct InboxSender {
    sender: Sender<InboundRecord>,
}

impl InboxSender {
    /// Queue a record. Returns `false` once the inbox has been dropped.
    pub fn send(&self, record: InboundRecord) -> bool {
        self.sender.send(record).is_ok()
    }
}

#[derive(Debug)]
pub struct Inbox {
    receiver: Receiver<InboundRecord>,
    sender: Sender<InboundRecord>,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { receiver, sender }
    }

    #[must_use]
    pub fn sender(&self) -> InboxSender {
        InboxSender {
            sender: self.sender.clone(),
        }
    }

    /// Next queued record without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<InboundRecord> {
        match self.receiver.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Every record queued so far, in arrival order.
    pub fn drain(&self) -> impl Iterator<Item = InboundRecord> + '_ {
        self.receiver.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Delta;
    use crate::model::DocumentId;
    use crate::record::ChangeRecord;

    fn open(doc: &str, ts: i64) -> InboundRecord {
        InboundRecord::Change(ChangeRecord::new(
            DocumentId::new(doc),
            Delta::open(ts, "a.txt", "", ""),
        ))
    }

    #[test]
    fn records_keep_arrival_order_across_threads() {
        let inbox = Inbox::new();
        let sender = inbox.sender();
        let handle = std::thread::spawn(move || {
            for ts in 0..5 {
                assert!(sender.send(open("d", ts)));
            }
        });
        handle.join().expect("producer thread");

        let stamps: Vec<_> = inbox
            .drain()
            .filter_map(|r| match r {
                InboundRecord::Change(c) => Some(c.delta.timestamp),
                _ => None,
            })
            .collect();
        assert_eq!(stamps, [0, 1, 2, 3, 4]);
        assert!(inbox.try_next().is_none());
    }

    #[test]
    fn send_fails_after_inbox_dropped() {
        let inbox = Inbox::new();
        let sender = inbox.sender();
        drop(inbox);
        assert!(!sender.send(open("d", 0)));
    }
}
