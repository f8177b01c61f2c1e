//! # Event subscribers for the streamvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   ProcessSupervisor ── publish(Event) ──► Bus ──► manager listener ──► SubscriberSet
//!                                                                      │
//!                                                          ┌───────────┼──────────┐
//!                                                          ▼           ▼          ▼
//!                                                      LogWriter    Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use streamvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct StallAlert;
//!
//! #[async_trait]
//! impl Subscribe for StallAlert {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::StallDetected {
//!             // page someone
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
