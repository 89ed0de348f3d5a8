/// Router Module Index
///
/// Routes are split by access level, and access control is attached once per
/// module as a route layer in `create_router`:
/// - `public`: anonymous reads plus the sign-in endpoints.
/// - `authenticated`: any valid session.
/// - `admin`: every mutating content route, behind `require_admin`.

/// Routes accessible to all clients.
pub mod public;

/// Routes that need a verified session token.
pub mod authenticated;

/// Routes restricted to the 'admin' role.
pub mod admin;
