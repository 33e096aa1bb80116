//! The notification bus: active messages keyed by sequence number.
//!
//! ## Sequence numbers
//!
//! Every added message gets the next [`Sequence`]. Numbers only grow and are
//! never handed out twice, not even after `clear_messages()`. A pending
//! dismiss timer therefore always names either its own entry or nothing.
//!
//! ## Lifecycle of an entry
//!
//! ```text
//! add_message ──► Pending ──(remove_message: timer or operator)──► Dismissed
//! ```
//!
//! `Dismissed` is terminal. Removal is idempotent, so a timer firing after a
//! manual dismissal (or the other way round) is harmless.
//!
//! ## Teardown
//!
//! Timer callbacks only hold a weak reference to the bus state. Once the
//! last `NotificationBus` handle is dropped, outstanding timers do nothing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use till_core::Sequence;
use till_events::{Event, EventBus, InMemoryEventBus, Subscription};

use crate::classify::classify_serializable;
use crate::message::Message;
use crate::scheduler::DismissScheduler;

/// Auto-dismiss delay used by [`NotificationBus::add_success`] unless overridden.
pub const SUCCESS_DISMISS: Duration = Duration::from_secs(5);

/// A message bound to its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub sequence: Sequence,
    #[serde(flatten)]
    pub message: Message,
}

/// Change notifications published after each state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEvent {
    Added {
        sequence: Sequence,
        message: Message,
        occurred_at: DateTime<Utc>,
    },
    Removed {
        sequence: Sequence,
        occurred_at: DateTime<Utc>,
    },
    Cleared {
        removed: usize,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for NotificationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::Added { .. } => "notifications.message.added",
            NotificationEvent::Removed { .. } => "notifications.message.removed",
            NotificationEvent::Cleared { .. } => "notifications.cleared",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NotificationEvent::Added { occurred_at, .. }
            | NotificationEvent::Removed { occurred_at, .. }
            | NotificationEvent::Cleared { occurred_at, .. } => *occurred_at,
        }
    }
}

#[derive(Debug)]
struct BusState {
    entries: BTreeMap<Sequence, Message>,
    next_sequence: Sequence,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<BusState>,
    changes: InMemoryEventBus<NotificationEvent>,
}

impl Shared {
    // Every mutation is a single map operation, so a poisoned lock still
    // guards consistent state.
    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, sequence: Sequence) -> bool {
        let removed = self.state().entries.remove(&sequence).is_some();
        if removed {
            debug!(%sequence, "notification dismissed");
            self.publish(NotificationEvent::Removed {
                sequence,
                occurred_at: Utc::now(),
            });
        }
        removed
    }

    fn publish(&self, event: NotificationEvent) {
        if let Err(err) = self.changes.publish(event) {
            warn!(error = %err, "failed to publish notification change");
        }
    }
}

/// Sequence-keyed list of active operator notifications.
///
/// Cheap to clone; clones share the same list. Construct one per session and
/// hand it to whoever needs to post or dismiss messages.
pub struct NotificationBus<S> {
    shared: Arc<Shared>,
    scheduler: Arc<S>,
    success_dismiss: Duration,
}

impl<S: DismissScheduler> NotificationBus<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BusState {
                    entries: BTreeMap::new(),
                    next_sequence: Sequence::FIRST,
                }),
                changes: InMemoryEventBus::new(),
            }),
            scheduler: Arc::new(scheduler),
            success_dismiss: SUCCESS_DISMISS,
        }
    }

    /// Override the auto-dismiss delay used by [`add_success`](Self::add_success).
    pub fn with_success_dismiss(mut self, delay: Duration) -> Self {
        self.success_dismiss = delay;
        self
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Store `message` under the next sequence number.
    ///
    /// With a non-zero `dismiss_after`, a one-shot timer removes the entry
    /// once the delay has elapsed.
    pub fn add_message(&self, message: Message, dismiss_after: Option<Duration>) -> Sequence {
        let sequence = {
            let mut state = self.shared.state();
            let sequence = state.next_sequence;
            state.entries.insert(sequence, message.clone());
            state.next_sequence = sequence.next();
            sequence
        };

        debug!(%sequence, kind = message.kind(), "notification added");
        self.shared.publish(NotificationEvent::Added {
            sequence,
            message,
            occurred_at: Utc::now(),
        });

        if let Some(delay) = dismiss_after.filter(|delay| !delay.is_zero()) {
            let shared: Weak<Shared> = Arc::downgrade(&self.shared);
            self.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let Some(shared) = shared.upgrade() {
                        shared.remove(sequence);
                    }
                }),
            );
        }

        sequence
    }

    pub fn add_invalid_input(
        &self,
        text: impl Into<String>,
        dismiss_after: Option<Duration>,
    ) -> Sequence {
        self.add_message(Message::invalid_input(text), dismiss_after)
    }

    /// Post a success confirmation that dismisses itself (5 s by default).
    pub fn add_success(&self, text: impl Into<String>) -> Sequence {
        self.add_message(Message::success(text), Some(self.success_dismiss))
    }

    /// Record an arbitrary failure payload. Never auto-dismissed.
    ///
    /// See [`classify`](crate::classify::classify) for how the payload is
    /// turned into a message.
    pub fn add_unknown_error<P>(&self, payload: &P) -> Sequence
    where
        P: Serialize + ?Sized,
    {
        self.add_message(classify_serializable(payload), None)
    }

    /// Dismiss an entry. Returns whether it was still present.
    ///
    /// Safe to call repeatedly and with sequences that were never issued.
    pub fn remove_message(&self, sequence: Sequence) -> bool {
        self.shared.remove(sequence)
    }

    /// Dismiss everything. Sequence numbering continues where it was.
    pub fn clear_messages(&self) {
        let removed = {
            let mut state = self.shared.state();
            let removed = state.entries.len();
            state.entries.clear();
            removed
        };

        if removed > 0 {
            debug!(removed, "notifications cleared");
            self.shared.publish(NotificationEvent::Cleared {
                removed,
                occurred_at: Utc::now(),
            });
        }
    }
}

impl<S> NotificationBus<S> {
    /// Active entries, oldest first.
    pub fn entries(&self) -> Vec<MessageEntry> {
        self.shared
            .state()
            .entries
            .iter()
            .map(|(sequence, message)| MessageEntry {
                sequence: *sequence,
                message: message.clone(),
            })
            .collect()
    }

    pub fn get(&self, sequence: Sequence) -> Option<Message> {
        self.shared.state().entries.get(&sequence).cloned()
    }

    pub fn contains(&self, sequence: Sequence) -> bool {
        self.shared.state().entries.contains_key(&sequence)
    }

    pub fn len(&self) -> usize {
        self.shared.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state().entries.is_empty()
    }

    /// The sequence number the next message will get.
    pub fn next_sequence(&self) -> Sequence {
        self.shared.state().next_sequence
    }

    /// Stream of change notifications for renderers.
    pub fn subscribe(&self) -> Subscription<NotificationEvent> {
        self.shared.changes.subscribe()
    }
}

impl<S> Clone for NotificationBus<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            scheduler: self.scheduler.clone(),
            success_dismiss: self.success_dismiss,
        }
    }
}

impl<S> core::fmt::Debug for NotificationBus<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("NotificationBus")
            .field("entries", &state.entries)
            .field("next_sequence", &state.next_sequence)
            .field("success_dismiss", &self.success_dismiss)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualScheduler, TokioScheduler};
    use proptest::prelude::*;
    use serde_json::json;

    fn manual_bus() -> (NotificationBus<ManualScheduler>, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        (NotificationBus::new(scheduler.clone()), scheduler)
    }

    #[test]
    fn sequences_start_at_zero_and_increase() {
        let (bus, _) = manual_bus();
        let a = bus.add_message(Message::unknown("a"), None);
        let b = bus.add_message(Message::unknown("b"), None);

        assert_eq!(a, Sequence::FIRST);
        assert_eq!(b, Sequence::new(1));
        assert_eq!(bus.next_sequence(), Sequence::new(2));
    }

    #[test]
    fn entries_are_oldest_first() {
        let (bus, _) = manual_bus();
        bus.add_success("first");
        bus.add_invalid_input("second", None);
        bus.add_unknown_error("third");

        let texts: Vec<String> = bus
            .entries()
            .into_iter()
            .map(|e| e.message.text().to_string())
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn sequences_are_never_reused_after_remove_or_clear() {
        let (bus, _) = manual_bus();
        let a = bus.add_message(Message::unknown("a"), None);
        bus.remove_message(a);
        let b = bus.add_message(Message::unknown("b"), None);
        bus.clear_messages();
        let c = bus.add_message(Message::unknown("c"), None);

        assert!(a < b && b < c);
        assert_eq!(bus.entries().len(), 1);
        assert_eq!(bus.entries()[0].sequence, c);
    }

    #[test]
    fn remove_is_idempotent_and_tolerates_unknown_sequences() {
        let (bus, _) = manual_bus();
        let a = bus.add_message(Message::unknown("a"), None);
        let b = bus.add_message(Message::unknown("b"), None);

        assert!(bus.remove_message(a));
        assert!(!bus.remove_message(a));
        assert!(!bus.remove_message(Sequence::new(999)));

        assert_eq!(bus.entries().len(), 1);
        assert_eq!(bus.get(b), Some(Message::unknown("b")));
    }

    #[test]
    fn invalid_input_with_delay_dismisses_itself() {
        let (bus, clock) = manual_bus();
        let seq = bus.add_invalid_input("price required", Some(Duration::from_secs(3)));

        clock.advance(Duration::from_secs(2));
        assert!(bus.contains(seq));
        clock.advance(Duration::from_secs(1));
        assert!(!bus.contains(seq));
    }

    #[test]
    fn missing_or_zero_delay_schedules_nothing() {
        let (bus, clock) = manual_bus();
        bus.add_invalid_input("sticky", None);
        bus.add_invalid_input("also sticky", Some(Duration::ZERO));

        assert_eq!(clock.pending(), 0);
        clock.advance(Duration::from_secs(3600));
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn success_dismisses_after_five_seconds() {
        let (bus, clock) = manual_bus();
        let seq = bus.add_success("Saved");
        assert_eq!(bus.get(seq), Some(Message::success("Saved")));

        clock.advance(Duration::from_millis(4_999));
        assert!(bus.contains(seq));
        clock.advance(Duration::from_millis(1));
        assert!(!bus.contains(seq));
    }

    #[test]
    fn success_delay_can_be_overridden() {
        let scheduler = ManualScheduler::new();
        let bus = NotificationBus::new(scheduler.clone()).with_success_dismiss(Duration::from_secs(1));
        let seq = bus.add_success("Saved");

        scheduler.advance(Duration::from_secs(1));
        assert!(!bus.contains(seq));
    }

    #[test]
    fn unknown_errors_are_classified_and_sticky() {
        let (bus, clock) = manual_bus();
        let boom = bus.add_unknown_error("boom");
        let ok = bus.add_unknown_error(&json!({"type": "Success", "message": "ok"}));
        let foo = bus.add_unknown_error(&json!({"foo": 1}));

        assert_eq!(bus.get(boom), Some(Message::unknown("boom")));
        assert_eq!(bus.get(ok), Some(Message::success("ok")));
        assert_eq!(bus.get(foo), Some(Message::unknown(r#"{"foo":1}"#)));

        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn manual_dismiss_before_timer_leaves_later_entries_intact() {
        let (bus, clock) = manual_bus();
        let a = bus.add_message(Message::unknown("A"), Some(Duration::from_secs(3)));
        let b = bus.add_message(Message::unknown("B"), Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(1));
        assert!(bus.remove_message(a));
        assert!(!bus.contains(a));
        assert!(bus.contains(b));

        // A's timer fires into an already-dismissed entry.
        clock.advance(Duration::from_secs(2));
        assert!(!bus.contains(a));
        assert!(bus.contains(b));

        clock.advance(Duration::from_secs(6));
        assert!(bus.contains(b));

        clock.advance(Duration::from_secs(1));
        assert!(!bus.contains(b));
        assert!(bus.is_empty());
    }

    #[test]
    fn timer_after_clear_does_not_touch_new_entries() {
        let (bus, clock) = manual_bus();
        bus.add_success("old");
        bus.clear_messages();
        let fresh = bus.add_message(Message::unknown("fresh"), None);

        clock.advance(SUCCESS_DISMISS);
        assert!(bus.contains(fresh));
    }

    #[test]
    fn timers_are_no_ops_once_the_bus_is_dropped() {
        let (bus, clock) = manual_bus();
        bus.add_success("bye");
        drop(bus);

        assert_eq!(clock.advance(SUCCESS_DISMISS), 1);
    }

    #[test]
    fn subscribers_see_every_change() {
        let (bus, clock) = manual_bus();
        let changes = bus.subscribe();

        let seq = bus.add_success("Saved");
        bus.add_unknown_error("boom");
        clock.advance(SUCCESS_DISMISS);
        bus.clear_messages();
        bus.clear_messages();

        let types: Vec<&str> = changes.drain().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "notifications.message.added",
                "notifications.message.added",
                "notifications.message.removed",
                "notifications.cleared",
            ]
        );
        assert!(!bus.contains(seq));
    }

    #[test]
    fn clones_share_the_same_list() {
        let (bus, _) = manual_bus();
        let other = bus.clone();
        let seq = other.add_success("shared");
        assert!(bus.contains(seq));
        bus.remove_message(seq);
        assert!(other.is_empty());
    }

    #[test]
    fn entries_serialize_flat() {
        let (bus, _) = manual_bus();
        bus.add_success("Saved");
        let json = serde_json::to_value(bus.entries()).unwrap();
        assert_eq!(
            json,
            json!([{"sequence": 0, "type": "Success", "message": "Saved"}])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_dismisses_on_the_tokio_clock() {
        let bus = NotificationBus::new(TokioScheduler::try_current().unwrap());
        let seq = bus.add_success("Saved");

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert!(bus.contains(seq));

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert!(!bus.contains(seq));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: sequences strictly increase across any mix of adds and removals.
        #[test]
        fn sequences_strictly_increase(ops in prop::collection::vec(0u8..4, 1..60)) {
            let (bus, clock) = manual_bus();
            let mut issued: Vec<Sequence> = Vec::new();

            for op in ops {
                match op {
                    0 => issued.push(bus.add_message(Message::unknown("x"), None)),
                    1 => issued.push(bus.add_success("ok")),
                    2 => {
                        if let Some(first) = issued.first() {
                            bus.remove_message(*first);
                        }
                        bus.clear_messages();
                    }
                    _ => { clock.advance(Duration::from_secs(2)); }
                }
            }

            prop_assert!(issued.windows(2).all(|w| w[0] < w[1]));
            for entry in bus.entries() {
                prop_assert!(entry.sequence < bus.next_sequence());
            }
        }
    }
}
