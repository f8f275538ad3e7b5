/// Validates a post-login redirect target to prevent open redirects.
///
/// Returns `Some(target)` if the target is a valid relative path, `None`
/// otherwise. The target travels through the identity provider inside the
/// state token, so an attacker-supplied value must never be able to send
/// the user off-site after login:
/// - must start with a single `/` (relative path)
/// - must not start with `//` (protocol-relative, e.g. `//evil.com`)
/// - must not contain control characters
/// - must not contain `://` (absolute URLs, `javascript:` and friends)
pub fn validate_redirect_target(target: &str) -> Option<&str> {
    if !target.starts_with('/') {
        return None;
    }

    if target.starts_with("//") {
        return None;
    }

    if target.chars().any(|c| c.is_control()) {
        return None;
    }

    if target.contains("://") {
        return None;
    }

    Some(target)
}
