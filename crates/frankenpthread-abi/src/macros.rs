//! Helper macros for ABI function generation.
//!
//! Provides the `abi_fn!` macro that generates `pub unsafe extern "C-unwind" fn`
//! wrappers. Symbols are unmangled only with the `interpose` feature so the
//! crate can be linked next to the host libc by default.

/// Generate an ABI entry point.
///
/// # Usage
///
/// ```ignore
/// abi_fn! {
///     /// Doc comment for the function.
///     fn my_func(arg1: Type1, arg2: Type2) -> ReturnType {
///         // implementation body
///     }
/// }
/// ```
///
/// `C-unwind` lets thread exit and cancellation unwind through the entry
/// point back to the thread trampoline.
#[allow(unused_macros)]
macro_rules! abi_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty
        $body:block
    ) => {
        $(#[$meta])*
        #[cfg_attr(feature = "interpose", unsafe(no_mangle))]
        #[allow(unused_unsafe)]
        pub unsafe extern "C-unwind" fn $name( $($arg : $argty),* ) -> $ret {
            unsafe { $body }
        }
    };

    // Variant without return type (returns ())
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? )
        $body:block
    ) => {
        $(#[$meta])*
        #[cfg_attr(feature = "interpose", unsafe(no_mangle))]
        #[allow(unused_unsafe)]
        pub unsafe extern "C-unwind" fn $name( $($arg : $argty),* ) {
            unsafe { $body }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use abi_fn;
