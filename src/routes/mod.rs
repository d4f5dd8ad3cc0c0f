/// Router Module Index
///
/// Splits the routing table by access level. Access control is attached to each
/// module as a whole in `create_router`, never per handler, so a route cannot be
/// exposed by forgetting a check.

/// Routes open to everyone. The request actor (if any) is unverified and only
/// influences what is visible, never what is allowed.
pub mod public;

/// Routes behind the hard gate: a verified bearer token is required.
pub mod authenticated;

/// Routes behind the hard gate and the `Admin` capability guard.
pub mod admin;
