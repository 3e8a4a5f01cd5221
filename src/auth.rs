//! Principal, bearer credentials and the session store.
//!
//! The console receives a JWT from the login endpoint. Its claims carry the
//! principal's id and role; the signature is the backend's business, so the
//! client only decodes the claims and checks expiry.

use std::fmt;

use hyper::http::{HeaderMap, HeaderValue};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::authority::RoleAuthority;
use crate::error::{Error, Result};
use crate::permission::Role;

/// The authenticated user's identity for the current session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal id)
    pub sub: String,
    /// Role wire name
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Build the principal these claims describe.
    pub fn principal(&self) -> Result<Principal> {
        let id = Uuid::parse_str(&self.sub).map_err(|_| Error::InvalidCredentials)?;
        let role = self.role.parse()?;
        Ok(Principal::new(id, role))
    }
}

/// Decode a token's claims without verifying its signature.
///
/// # Returns
/// - `Ok(Claims)` if the token is well formed and unexpired
/// - `Err(Error::TokenExpired)` if the token has expired
/// - `Err(Error::InvalidCredentials)` for any other decoding failure
pub fn decode_claims(token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.leeway = 0;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).map_err(
        |e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
            _ => Error::InvalidCredentials,
        },
    )?;

    Ok(data.claims)
}

/// Format a token as an `Authorization` header value.
pub fn bearer(token: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| Error::InvalidCredentials)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers
        .get(hyper::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    value
        .get(..7)
        .filter(|p| p.eq_ignore_ascii_case("bearer "))
        .map(|_| &value[7..])
}

/// A signed-in principal together with the credential that proves it.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub principal: Principal,
    token: String,
}

impl SignedIn {
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for SignedIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedIn")
            .field("principal", &self.principal)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Where the guard and the interceptors read the current principal from.
pub trait PrincipalSource: Send + Sync {
    fn current_principal(&self) -> Option<Principal>;

    fn is_authenticated(&self) -> bool {
        self.current_principal().is_some()
    }
}

/// Process-wide session store.
///
/// Created empty, filled on login, replaced on profile refresh, emptied on
/// logout. Observers subscribe to changes through a watch channel.
pub struct Session {
    state: watch::Sender<Option<SignedIn>>,
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self { state }
    }

    /// Establish a session from a bearer token issued by the login endpoint.
    pub fn login(&self, token: &str) -> Result<Principal> {
        let principal = decode_claims(token)?.principal()?;
        info!(principal = %principal.id, role = %principal.role, "Signed in");
        self.state.send_replace(Some(SignedIn {
            principal: principal.clone(),
            token: token.to_string(),
        }));
        Ok(principal)
    }

    /// Replace the principal after a profile refresh, keeping the credential.
    pub fn refresh(&self, principal: Principal) -> Result<()> {
        let mut refreshed = false;
        self.state.send_if_modified(|state| match state {
            Some(signed_in) if signed_in.principal != principal => {
                signed_in.principal = principal.clone();
                refreshed = true;
                true
            }
            Some(_) => {
                refreshed = true;
                false
            }
            None => false,
        });
        if refreshed {
            Ok(())
        } else {
            Err(Error::Unauthenticated)
        }
    }

    /// Destroy the session. Logging out twice is harmless.
    pub fn logout(&self) {
        let previous = self.state.send_replace(None);
        if let Some(signed_in) = previous {
            info!(principal = %signed_in.principal.id, "Signed out");
        }
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state.borrow().as_ref().map(|s| s.principal.clone())
    }

    /// The current credential, if any.
    pub fn token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|s| s.token.clone())
    }

    /// Capability snapshot for the current principal.
    pub fn authority(&self) -> RoleAuthority {
        RoleAuthority::new(self.principal())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SignedIn>> {
        self.state.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl PrincipalSource for Session {
    fn current_principal(&self) -> Option<Principal> {
        self.principal()
    }
}

impl PrincipalSource for Option<Principal> {
    fn current_principal(&self) -> Option<Principal> {
        self.clone()
    }
}

/// Sign a token for `principal` the way the login endpoint does.
#[cfg(test)]
pub(crate) fn signed_token(principal: &Principal, lifetime_hours: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = jiff::Timestamp::now();
    let claims = Claims {
        sub: principal.id.to_string(),
        role: principal.role.as_str().to_string(),
        exp: now.as_second() + lifetime_hours * 3600,
        iat: now.as_second(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"assetdesk-unit-test-secret"),
    )
    .unwrap()
}
