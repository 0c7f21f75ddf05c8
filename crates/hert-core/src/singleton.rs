//! Lazily constructed process-wide instances
//!
//! A singleton type implements [`Singleton`] through the [`singleton!`]
//! macro, which stores the instance in a function-local `OnceLock`. The
//! instance is built on first access, exactly once even when several threads
//! race for it, and is only ever handed out as `&'static Self`. Singleton
//! types should not implement `Clone` or `Copy`; use interior mutability for
//! state that changes.

/// A type with exactly one process-wide instance
pub trait Singleton: Send + Sync + 'static {
    /// Get the instance, constructing it on first use
    fn instance() -> &'static Self;
}

/// Implement [`Singleton`] for a type.
///
/// `singleton!(Type)` constructs with `Type::new()`; `singleton!(Type, expr)`
/// constructs with `expr`.
///
/// ```
/// use hert_core::{singleton, Singleton};
///
/// pub struct Registry {
///     name: &'static str,
/// }
///
/// impl Registry {
///     fn new() -> Self {
///         Self { name: "registry" }
///     }
/// }
///
/// singleton!(Registry);
///
/// assert_eq!(Registry::instance().name, "registry");
/// ```
#[macro_export]
macro_rules! singleton {
    ($ty:ty) => {
        $crate::singleton!($ty, <$ty>::new());
    };
    ($ty:ty, $init:expr) => {
        impl $crate::singleton::Singleton for $ty {
            fn instance() -> &'static Self {
                static INSTANCE: ::std::sync::OnceLock<$ty> = ::std::sync::OnceLock::new();
                INSTANCE.get_or_init(|| $init)
            }
        }
    };
}
