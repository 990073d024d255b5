//! User-Agent string sent with every listing and file request.

/// Default User-Agent for mirror traffic (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("repo-mirror/{version} (tree-mirror)")
}
