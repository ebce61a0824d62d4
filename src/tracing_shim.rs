//! Either `tracing` or no-op stand-ins that can be used in its place.
//!
//! Import logging macros from here rather than from `tracing` so that call sites do not need a
//! `#[cfg]` of their own. The `#[instrument]` attribute is the only exception and must be written
//! as `#[cfg_attr(feature = "tracing", tracing::instrument)]`.
//!
//! Only what the crate uses is provided. Extend it as needed.

#![allow(unused_imports, unused_macros, dead_code)]

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, debug_span, info, warn};
#[cfg(feature = "tracing")]
pub(crate) use tracing_futures::Instrument;

#[cfg(not(feature = "tracing"))]
macro_rules! event {
    ($($x:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! event_span {
    ($($x:tt)*) => {
        ()
    };
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {event as debug, event as info, event as warn, event_span as debug_span};

#[cfg(not(feature = "tracing"))]
pub(crate) trait Instrument: Sized {
    fn instrument(self, span: ()) -> Self;
}

#[cfg(not(feature = "tracing"))]
impl<T> Instrument for T {
    fn instrument(self, _: ()) -> Self {
        self
    }
}
