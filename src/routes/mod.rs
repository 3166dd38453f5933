//! Router Module Index
//!
//! Routes grouped by the access they require. `create_router` wraps the
//! authenticated and admin groups in the authentication layer; admin checks
//! happen inside the handlers through `policy::require_admin`.

/// Routes reachable without a token.
pub mod public;

/// Routes that need a valid token.
pub mod authenticated;

/// Account registration routes, restricted to administrators.
pub mod admin;
