use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{MeetingId, RoomId};

const CHANNEL_CAPACITY: usize = 256;

/// What happened to a meeting. Payloads are ids only — message content and
/// delivery are the embedder's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingEvent {
    Booked { id: MeetingId },
    Rescheduled { id: MeetingId },
    Cancelled { id: MeetingId },
    Archived { id: MeetingId },
    Promoted { retired: MeetingId, new_head: MeetingId },
}

/// Broadcast hub fanning meeting events out per room.
pub struct EventHub {
    channels: DashMap<RoomId, broadcast::Sender<MeetingEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a room. Creates the channel if needed.
    pub fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<MeetingEvent> {
        let sender = self
            .channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send an event. No-op if nobody is listening.
    pub fn send(&self, room_id: RoomId, event: MeetingEvent) {
        if let Some(sender) = self.channels.get(&room_id) {
            let _ = sender.send(event);
        }
    }
}
