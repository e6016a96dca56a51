//! Logging facade
//!
//! The macros forward to [`defmt`](https://docs.rs/defmt) when the `defmt` feature
//! is enabled and compile to nothing otherwise. They are exported so the port
//! bindings log the same way.

#[cfg(feature = "defmt")]
#[doc(hidden)]
pub mod hidden {
    // Required so the macros can access it.
    pub use defmt;
}

/// Logs a message at the trace level.
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {{
        use $crate::log::hidden::defmt;
        defmt::trace!($($arg)*);
    }};
}

/// Logs a message at the debug level.
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        use $crate::log::hidden::defmt;
        defmt::debug!($($arg)*);
    }};
}

/// No-op log macro.
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! trace {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        let _ = $fmt;
        $(let _ = &$arg;)*
    }};
}

/// No-op log macro.
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! debug {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        let _ = $fmt;
        $(let _ = &$arg;)*
    }};
}
