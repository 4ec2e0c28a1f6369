//! Change Notification Events
//!
//! The core emits named events when the profile changes; presentation code
//! subscribes through plain mpsc channels. The core has no knowledge of its
//! subscribers and never blocks on one: a disconnected receiver is dropped
//! on the next emit.

use std::sync::mpsc::{channel, Receiver, Sender};

use parking_lot::Mutex;

use crate::types::{ActivityId, SkillCategory};

/// Events produced by the profile store.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ProgressSaved {
        profile_id: String,
    },
    ProgressReset {
        profile_id: String,
    },
    LetterMastered {
        item_id: String,
        mastered_count: usize,
    },
    WordMastered {
        category: SkillCategory,
        item_id: String,
        mastered_count: usize,
    },
    AchievementUnlocked {
        achievement_id: String,
    },
    GameRecorded {
        activity: ActivityId,
        score: u32,
        stars: u8,
    },
}

/// Fan-out bus for [`ProgressEvent`]s.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ProgressEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<ProgressEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Delivers the event to every live subscriber, pruning dead ones.
    pub fn emit(&self, event: ProgressEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
