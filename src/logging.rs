//! Crate-internal logging macros.
//!
//! Every macro forwards to `tracing` under the `bridge_listener` target when the `tracing`
//! feature is enabled. Without the feature the arguments are still evaluated by reference so
//! that field expressions keep type-checking, but nothing is emitted.

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::error!(target: "bridge_listener", $($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            $crate::__consume_fields!($($arg)*);
        }
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::warn!(target: "bridge_listener", $($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            $crate::__consume_fields!($($arg)*);
        }
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::info!(target: "bridge_listener", $($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            $crate::__consume_fields!($($arg)*);
        }
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::debug!(target: "bridge_listener", $($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            $crate::__consume_fields!($($arg)*);
        }
    }};
}

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::trace!(target: "bridge_listener", $($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            $crate::__consume_fields!($($arg)*);
        }
    }};
}

/// Walks `field = value` pairs and drops the message literal.
///
/// Only the `field = [%|?]expr, ..., "message"` shape is supported, which is the only shape the
/// crate uses.
#[doc(hidden)]
#[macro_export]
macro_rules! __consume_fields {
    ($field:ident = % $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__consume_fields!($($rest)*);
    }};
    ($field:ident = ? $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__consume_fields!($($rest)*);
    }};
    ($field:ident = $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__consume_fields!($($rest)*);
    }};
    ($lit:literal $(,)?) => {};
    () => {};
}
