/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules. Access control
/// is applied at the module level (via Axum layers), never inside individual handlers.

/// Routes accessible to all clients (health check).
pub mod public;

/// Routes restricted to users holding the 'admin' role.
/// Wrapped by the access gate, with the sensitive operations additionally audited.
pub mod admin;
