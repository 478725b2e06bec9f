use actix_web::HttpRequest;
use log::debug;
use signal_payment_engine::signature::{sign_payload, verify_signature};
use sps_common::Secret;

use crate::errors::ServerError;

/// The caller's identity, asserted by the authenticating reverse proxy in front of this service.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// The shared administrative key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Extracts the authenticated user id from the request headers.
pub fn require_user(req: &HttpRequest) -> Result<String, ServerError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::Unauthenticated(format!("Missing {USER_ID_HEADER} header.")))?;
    Ok(user_id.to_string())
}

/// Checks the administrative key header against the configured key.
pub fn require_admin(req: &HttpRequest, admin_key: &Secret<String>) -> Result<(), ServerError> {
    if admin_key.reveal().is_empty() {
        return Err(ServerError::InsufficientPermissions("No administrative key is configured.".to_string()));
    }
    let provided = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    if keys_match(provided, admin_key.reveal()) {
        Ok(())
    } else {
        debug!("💻️ Administrative request rejected: bad or missing {ADMIN_KEY_HEADER}");
        Err(ServerError::InsufficientPermissions("Invalid administrative key.".to_string()))
    }
}

/// Constant-time key comparison. Both keys are run through the webhook signature codec so the comparison happens
/// over fixed-length MACs rather than the raw strings.
fn keys_match(provided: &str, expected: &str) -> bool {
    const PROBE: &[u8] = b"sps.admin.key.check";
    let candidate = sign_payload(PROBE, provided);
    verify_signature(PROBE, &candidate, expected)
}
