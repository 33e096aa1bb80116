//! Operator-facing notifications with optional auto-dismiss.
//!
//! - [`Message`]: the closed taxonomy plus an opaque pass-through variant
//! - [`classify`]: turns any failure payload into a displayable message
//! - [`DismissScheduler`]: the deferred-callback seam (tokio or manual clock)
//! - [`NotificationBus`]: the sequence-keyed list of active messages

pub mod bus;
pub mod classify;
pub mod message;
pub mod scheduler;

pub use bus::{MessageEntry, NotificationBus, NotificationEvent, SUCCESS_DISMISS};
pub use classify::{classify, classify_serializable};
pub use message::{Message, MessageKind};
pub use scheduler::{DismissScheduler, DismissTask, ManualScheduler, TokioScheduler};
pub use till_core::Sequence;
