//! Signed-cookie sessions.
//!
//! The session payload (username, role, optional selected identifier) is
//! serialized to JSON and carried in a single cookie as
//! `base64url(payload).base64url(hmac_sha256(secret, payload))`. Decoding
//! verifies the signature first; a tampered or malformed cookie decodes to
//! `None`, which callers treat as an anonymous request.
//!
//! The signing secret comes from configuration and is required at startup.

use crate::auth::AccountType;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated session state.
///
/// `selected_identifier` is set by the enter-number step for standard users
/// and consumed by the personal score view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_identifier: Option<String>,
}

impl Session {
    pub fn new(username: &str, account_type: AccountType) -> Self {
        Session {
            username: username.to_string(),
            account_type,
            selected_identifier: None,
        }
    }
}

/// Encodes and verifies session cookies with an HMAC-SHA256 signature.
#[derive(Clone)]
pub struct SessionCodec {
    secret: Vec<u8>,
}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        SessionCodec {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Serialize and sign a session into a cookie value.
    pub fn encode(&self, session: &Session) -> String {
        let payload = serde_json::to_vec(session).expect("session serializes to JSON");
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(self.sign(&payload))
        )
    }

    /// Verify and deserialize a cookie value. Any malformed or tampered
    /// token is `None`.
    pub fn decode(&self, token: &str) -> Option<Session> {
        let (payload_b64, mac_b64) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let mac = URL_SAFE_NO_PAD.decode(mac_b64).ok()?;

        let mut verifier = HmacSha256::new_from_slice(&self.secret).expect("HMAC takes any key");
        verifier.update(&payload);
        verifier.verify_slice(&mac).ok()?;

        serde_json::from_slice(&payload).ok()
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC takes any key");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Extract and verify the session from request headers.
pub fn session_from_headers(codec: &SessionCodec, headers: &HeaderMap) -> Option<Session> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    let token = cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("session="))?;
    codec.decode(token)
}

/// `Set-Cookie` value establishing a session.
pub fn set_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value clearing the session.
pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}
