//! Track events and their subscriber list

use std::sync::mpsc;

use crate::core::types::Vec3;

/// Something that happened while generating the track
#[derive(Clone, Debug, PartialEq)]
pub enum TrackEvent {
    SegmentCreated(u64),
    SegmentExtruded(u64),
    SegmentActivated(u64),
    SegmentEntered(u64),
    LevelEntered {
        previous: Option<usize>,
        level: usize,
        segment: u64,
    },
    LevelLoaded(usize),
    LevelWillLoad(usize),
    /// The last level finished and iteration does not continue
    LevelsDepleted,
    SequenceEntered {
        level: usize,
        sequence: usize,
    },
    Ready,
    /// Startup progress in `[0, 1]`
    Progress(f32),
    /// The world moved by `-delta`
    OriginShifted(Vec3),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Fan-out of [`TrackEvent`]s to channel subscribers
///
/// Subscribers whose receiver was dropped are removed on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriberId, mpsc::Sender<TrackEvent>)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> (SubscriberId, mpsc::Receiver<TrackEvent>) {
        let (tx, rx) = mpsc::channel();
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, tx));
        (id, rx)
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscriber, _)| *subscriber != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn emit(&mut self, event: TrackEvent) {
        log::trace!("Event {:?}", event);
        self.subscribers.retain(|(id, tx)| {
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                log::debug!("Dropping disconnected event subscriber {:?}", id);
            }
            delivered
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives() {
        let mut bus = EventBus::new();
        let (_, a) = bus.subscribe();
        let (_, b) = bus.subscribe();
        bus.emit(TrackEvent::Ready);
        assert_eq!(a.try_recv().ok(), Some(TrackEvent::Ready));
        assert_eq!(b.try_recv().ok(), Some(TrackEvent::Ready));
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let (id, rx) = bus.subscribe();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(TrackEvent::LevelsDepleted);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_removed() {
        let mut bus = EventBus::new();
        let (_, rx) = bus.subscribe();
        let (_, keep) = bus.subscribe();
        drop(rx);
        bus.emit(TrackEvent::SegmentCreated(1));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.try_recv().ok(), Some(TrackEvent::SegmentCreated(1)));
    }
}
