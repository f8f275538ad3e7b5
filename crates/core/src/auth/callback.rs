use url::Url;

use super::CallbackParams;

/// Extract the authorization code and state token from a callback URL.
///
/// Returns `None` when no `code` parameter is present: either the
/// handshake has not started or the user landed on the page directly.
pub fn parse_callback(url: &Url) -> Option<CallbackParams> {
    let code = url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())?;

    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string());

    Some(CallbackParams { code, state })
}

/// Remove the `code` and `state` parameters from a callback URL,
/// preserving the path, any other query parameters, and the fragment.
///
/// The visible URL is rewritten to this so a page refresh does not
/// re-trigger the exchange.
pub fn strip_callback_params(url: &Url) -> Url {
    let mut stripped = url.clone();
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "code" && k != "state")
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    stripped.set_query(None);
    if !remaining.is_empty() {
        let mut pairs = stripped.query_pairs_mut();
        for (k, v) in &remaining {
            pairs.append_pair(k, v);
        }
    }
    stripped
}
