use std::fmt;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::{accountability::Accountability, error::AuthError};

/// Capability
///
/// A predicate over the request actor. Routes declare the capability they need;
/// new roles only need new flags, not new guard types.
#[derive(Clone, Copy)]
pub enum Capability {
    /// Actor's role grants administrative access.
    Admin,
    /// Actor's role grants access to the citizen-facing application.
    AppAccess,
    Custom(fn(&Accountability) -> bool),
}

impl Capability {
    pub fn permits(&self, actor: &Accountability) -> bool {
        match self {
            Capability::Admin => actor.is_admin,
            Capability::AppAccess => actor.has_app_access,
            Capability::Custom(predicate) => predicate(actor),
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Admin => f.write_str("Admin"),
            Capability::AppAccess => f.write_str("AppAccess"),
            Capability::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// RoleGuard
///
/// Allows continuation iff an actor is present and satisfies the capability.
/// Denials are uniform so callers cannot probe which flag was missing.
#[derive(Debug, Clone, Copy)]
pub struct RoleGuard {
    capability: Capability,
}

impl RoleGuard {
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }

    pub fn check(&self, actor: Option<&Accountability>) -> Result<(), AuthError> {
        match actor {
            Some(actor) if self.capability.permits(actor) => Ok(()),
            Some(actor) => {
                tracing::debug!(actor = %actor.id, capability = ?self.capability, "capability check denied");
                Err(AuthError::Forbidden)
            }
            None => Err(AuthError::Forbidden),
        }
    }
}

/// require_capability
///
/// Route-layer middleware. Reads the actor attached by `attach_accountability` and
/// applies the guard given as layer state:
/// `route_layer(middleware::from_fn_with_state(RoleGuard::new(Capability::Admin), require_capability))`.
pub async fn require_capability(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let actor = request
        .extensions()
        .get::<Option<Accountability>>()
        .and_then(Option::as_ref);

    guard.check(actor)?;
    Ok(next.run(request).await)
}
