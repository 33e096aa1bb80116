//! Change events and the in-process pub/sub used to surface them.
//!
//! The state containers never render anything themselves. Presentation code
//! subscribes to their change streams and re-reads state when notified.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
