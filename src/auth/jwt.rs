use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::auth::claims::{Claims, Role};
use crate::config::JwtConfig;
use crate::state::AppState;

/// Injected time source. Production uses the system clock; tests pin it.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> OffsetDateTime + Send + Sync>);

impl Clock {
    pub fn system() -> Self {
        Self(Arc::new(OffsetDateTime::now_utc))
    }

    pub fn fixed(at: OffsetDateTime) -> Self {
        Self(Arc::new(move || at))
    }

    pub fn now(&self) -> OffsetDateTime {
        (self.0)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature or structural check failed.
    #[error("malformed token")]
    Malformed,
    /// The token was valid once but its expiry instant has passed.
    #[error("token expired")]
    Expired,
}

/// Signing and verification keys plus the token policy (issuer, audience,
/// TTL) and the clock expiry is judged against.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
    pub clock: Clock,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            clock: state.clock.clone(),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, email: &str, role: Role) -> anyhow::Result<String> {
        let now = self.clock.now();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: email.to_owned(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %email, "jwt signed");
        Ok(token)
    }

    /// Checks signature, issuer and audience via `jsonwebtoken`; expiry is
    /// checked manually against the injected clock instead of the process
    /// clock. A token is `Expired` once now >= exp.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            TokenError::Malformed
        })?;
        if self.clock.now().unix_timestamp() >= data.claims.exp as i64 {
            return Err(TokenError::Expired);
        }
        debug!(subject = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

    fn make_keys(secret: &str, issuer: &str, audience: &str, clock: Clock) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl: Duration::from_secs(300),
            clock,
        }
    }

    #[test]
    fn sign_and_verify_roundtrip_preserves_subject_and_role() {
        let keys = make_keys("dev-secret", "iss", "aud", Clock::fixed(T0));
        let token = keys.sign("alice@example.com", Role::Admin).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "iss");
        assert_eq!(claims.aud, "aud");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn verify_fails_expired_once_clock_passes_expiry() {
        let signer = make_keys("dev-secret", "iss", "aud", Clock::fixed(T0));
        let token = signer.sign("alice@example.com", Role::User).expect("sign");

        // exactly at expiry: now >= exp
        let at_expiry = make_keys(
            "dev-secret",
            "iss",
            "aud",
            Clock::fixed(T0 + TimeDuration::seconds(300)),
        );
        assert_eq!(at_expiry.verify(&token).unwrap_err(), TokenError::Expired);

        // one second before expiry is still fine
        let just_before = make_keys(
            "dev-secret",
            "iss",
            "aud",
            Clock::fixed(T0 + TimeDuration::seconds(299)),
        );
        assert!(just_before.verify(&token).is_ok());
    }

    #[test]
    fn verify_fails_malformed_on_tampered_signature() {
        let keys = make_keys("dev-secret", "iss", "aud", Clock::fixed(T0));
        let mut token = keys.sign("alice@example.com", Role::User).expect("sign");
        let last = token.pop().expect("token not empty");
        token.push(if last == 'A' { 'B' } else { 'A' });
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn verify_fails_malformed_with_wrong_secret() {
        let signer = make_keys("dev-secret", "iss", "aud", Clock::fixed(T0));
        let other = make_keys("other-secret", "iss", "aud", Clock::fixed(T0));
        let token = signer.sign("alice@example.com", Role::User).expect("sign");
        assert_eq!(other.verify(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let signer = make_keys("same-secret", "good-iss", "good-aud", Clock::fixed(T0));
        let verifier = make_keys("same-secret", "bad-iss", "bad-aud", Clock::fixed(T0));
        let token = signer.sign("alice@example.com", Role::User).expect("sign");
        assert_eq!(verifier.verify(&token).unwrap_err(), TokenError::Malformed);
    }

    #[tokio::test]
    async fn keys_from_state_pick_up_config_and_clock() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        assert_eq!(keys.issuer, "test-issuer");
        assert_eq!(keys.audience, "test-aud");
        assert_eq!(keys.ttl, Duration::from_secs(300));
    }
}
