//! Runtime core: per-stream supervision and lifecycle.
//!
//! Internal modules:
//! - [`actor`]: the per-stream state machine (launch, watch, retry);
//! - [`supervisor`]: [`ProcessSupervisor`], the owner handle of one actor;
//! - [`manager`]: [`SupervisorManager`], one supervisor per configured stream;
//! - [`builder`]: [`ManagerBuilder`] wiring bus, subscribers and launcher;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`state`]: observable [`StateSnapshot`].

mod actor;
mod builder;
mod manager;
mod shutdown;
mod state;
mod supervisor;

pub use builder::{DEFAULT_BUS_CAPACITY, ManagerBuilder};
pub use manager::SupervisorManager;
pub use shutdown::wait_for_shutdown_signal;
pub use state::{StateSnapshot, SupervisorStatus};
pub use supervisor::{ProcessSupervisor, SupervisorContext};
