/// Router Module Index
///
/// Splits the console's routes by who may reach them. Protection is applied per handler
/// through the `VisitorAccess` and `AdminAccess` extractors, so a handler that forgets to
/// take one is visibly unguarded in its signature.

/// Routes reachable without any session: login flows, sign-out, layout and preferences.
pub mod public;

/// Routes behind an SSO session (any role).
pub mod visitor;

/// Routes behind a valid admin session and the administrator role. Nested under `/admin`.
pub mod admin;
