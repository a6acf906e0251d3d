//! Utility macros for reducing boilerplate

/// Implement `FromRef` from a route state to the shared `AuthConfig`.
///
/// The `AuthSession` extractor pulls an `AuthConfigRef` out of whatever
/// state the route was built with; every route state that protects a
/// handler needs this wiring.
///
/// # Example
/// ```ignore
/// impl_auth_from_ref!(StarState);
/// // Expands to:
/// impl axum::extract::FromRef<Arc<StarState>> for AuthConfigRef {
///     fn from_ref(state: &Arc<StarState>) -> Self {
///         AuthConfigRef(state.auth.clone())
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_auth_from_ref {
    ($state:ty) => {
        impl axum::extract::FromRef<std::sync::Arc<$state>>
            for $crate::middleware::AuthConfigRef
        {
            fn from_ref(state: &std::sync::Arc<$state>) -> Self {
                $crate::middleware::AuthConfigRef(state.auth.clone())
            }
        }
    };
}
