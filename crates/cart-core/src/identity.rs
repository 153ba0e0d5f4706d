use crate::cache::ListCache;
use anyhow::{Context, Result};
use uuid::Uuid;

const UID_KEY: &str = "anonymous_uid";

/// Sign in anonymously: return the stable per-device user id, creating and
/// persisting one on first use.
pub fn sign_in_anonymously(cache: &ListCache) -> Result<String> {
    if let Some(uid) = cache
        .get(UID_KEY)
        .context("Failed to load stored identity")?
    {
        if !uid.is_empty() {
            return Ok(uid);
        }
    }

    let uid = Uuid::new_v4().to_string();
    cache
        .set(UID_KEY, &uid)
        .context("Failed to persist anonymous identity")?;
    tracing::debug!(%uid, "created anonymous identity");
    Ok(uid)
}
