//! Admission decisions and limiter state management.

mod clock;
mod events;
mod gate;
mod policy;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{EventSink, GateAction, GateEvent, MemorySink, TracingSink};
pub use gate::{Decision, Gate};
pub use policy::{ClassWindows, OperationLists, PolicyClass, PolicyConfig, PolicyTable};
pub use store::{LimiterStats, LimiterStore};
pub use sweeper::{Sweeper, SweeperHandle};
