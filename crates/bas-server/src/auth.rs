use axum::http::{header, HeaderMap};

/// Checks the agent handshake's `X-Agent-Key` header against the configured
/// secret. `None` means no secret is configured, so every connection is
/// accepted — the full auth/authz story lives in the REST layer this core
/// treats as an external collaborator (SPEC §1); this is only the narrow
/// slice the session handshake itself is asked to honor (§6).
pub fn agent_key_matches(headers: &HeaderMap, expected: &Option<String>) -> bool {
    match expected {
        None => true,
        Some(expected) => headers
            .get("x-agent-key")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|actual| actual == expected),
    }
}

/// Checks the dashboard handshake's bearer token against the configured
/// token. `None` means no token is configured.
pub fn dashboard_token_matches(headers: &HeaderMap, expected: &Option<String>) -> bool {
    match expected {
        None => true,
        Some(expected) => extract_bearer_token(headers).is_some_and(|token| &token == expected),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())?;
    let trimmed = auth.trim();
    let bearer = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?;
    let token = bearer.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
