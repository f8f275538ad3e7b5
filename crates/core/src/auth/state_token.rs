use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// Payload round-tripped through the identity provider's `state`
/// parameter. The redirect target travels inside the token itself: the
/// provider round trip is a full cross-origin navigation, so nothing in
/// browser-local state can be assumed to survive it.
#[derive(Debug, Serialize, Deserialize)]
struct StatePayload {
    nonce: String,
    return_to: String,
}

/// Generate a random nonce for the state token.
pub fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Encode `return_to` into an opaque, URL-safe state token.
pub fn encode_state(return_to: &str) -> String {
    let payload = StatePayload {
        nonce: generate_nonce(),
        return_to: return_to.to_string(),
    };
    // StatePayload has no non-serializable fields, so this cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Recover the redirect target from a state token.
///
/// Returns `None` for anything that does not decode to a payload we
/// produced; callers fall back to their configured default target rather
/// than treating this as an error.
pub fn decode_state(token: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    let payload: StatePayload = serde_json::from_slice(&bytes).ok()?;
    Some(payload.return_to)
}
