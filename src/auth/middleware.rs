use axum::{
    extract::{FromRef, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::claims::Principal;
use crate::auth::jwt::JwtKeys;
use crate::state::AppState;
use crate::users::repo::User;

/// Per-request authentication pass. Attaches a `Principal` to the request
/// extensions when a bearer token fully resolves, and forwards the request
/// either way — missing, invalid or expired credentials never abort the
/// request here. Protected handlers reject via the `AuthUser` extractor.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(principal) = resolve_principal(&state, request.headers()).await {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Option<Principal> {
    let token = bearer_token(headers)?;

    let keys = JwtKeys::from_ref(state);
    let claims = match keys.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "bearer token rejected");
            return None;
        }
    };

    // The subject is re-resolved against storage on every request: the token
    // only proves identity, the current role comes from the users table. A
    // role change therefore applies on the next request without revocation.
    let user = match User::find_by_email(&state.db, &claims.sub).await {
        Ok(found) => found?,
        Err(err) => {
            warn!(error = %err, "principal lookup failed");
            return None;
        }
    };

    Some(Principal {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}
