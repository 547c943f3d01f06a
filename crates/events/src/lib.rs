//! Domain event contracts + the analytics emission channel.

pub mod analytics;
pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use analytics::AnalyticsEvent;
pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
