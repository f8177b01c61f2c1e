//! Configuration: stream definitions, tunables and their resolution.
//!
//! ## Contents
//! - [`StreamDefinition`] one capture source (`id`, `source_url`)
//! - [`Settings`] / [`CaptureSettings`] resolved runtime settings
//! - [`ConfigResolver`] / [`LayeredResolver`] CLI > env > file > defaults

mod resolver;
mod settings;
mod stream;

pub use resolver::{ConfigResolver, LayeredResolver, Overrides};
pub use settings::{CaptureSettings, DEFAULT_ERROR_KEYWORDS, PartialSettings, RetrySection, Settings};
pub use stream::StreamDefinition;
