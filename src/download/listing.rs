//! Directory listing fetch and validation.
//!
//! A listing is the JSON array a contents API returns for one directory:
//!
//! ```json
//! [
//!   {"type": "file", "name": "a.txt", "download_url": "https://host/raw/a.txt"},
//!   {"type": "dir",  "name": "sub",   "url": "https://host/api/contents/sub"}
//! ]
//! ```
//!
//! Validation happens here, at the parse boundary. An entry missing the
//! field its type requires, or whose name would escape the directory, makes
//! the whole listing [`ListingError::Malformed`].

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::client::Transport;
use super::error::ListingError;

/// One validated entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    /// A regular file and where to fetch its body.
    File {
        /// File name, a single path component.
        name: String,
        /// URL of the raw file body.
        download_url: String,
    },
    /// A subdirectory and where to fetch its listing.
    Directory {
        /// Directory name, a single path component.
        name: String,
        /// Listing URL for the subdirectory.
        listing_url: String,
    },
}

impl DirectoryEntry {
    /// Returns the entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Directory { name, .. } => name,
        }
    }
}

/// The validated contents of one remote directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Supported entries in listing order.
    pub entries: Vec<DirectoryEntry>,
    /// Entries of an unsupported type (symlinks, submodules) that were skipped.
    pub skipped: usize,
}

impl Listing {
    /// Returns true if there is nothing to mirror.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits entries into `(files, directories)`, keeping listing order.
    #[must_use]
    pub fn partition(self) -> (Vec<DirectoryEntry>, Vec<DirectoryEntry>) {
        self.entries
            .into_iter()
            .partition(|entry| matches!(entry, DirectoryEntry::File { .. }))
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    download_url: Option<String>,
    url: Option<String>,
}

/// Fetches and validates the listing at `url`.
///
/// # Errors
///
/// Returns [`ListingError::Transport`] when the request fails and
/// [`ListingError::Malformed`] when the body is not a valid listing.
#[instrument(level = "debug", skip(transport))]
pub async fn fetch_listing(transport: &dyn Transport, url: &str) -> Result<Listing, ListingError> {
    let value = transport.get_json(url).await?;
    let listing = parse_listing(url, value)?;
    debug!(
        entries = listing.entries.len(),
        skipped = listing.skipped,
        "fetched listing"
    );
    Ok(listing)
}

/// Validates an already-decoded listing document fetched from `url`.
///
/// # Errors
///
/// Returns [`ListingError::Malformed`] if the document is not an array of
/// well-formed entries.
pub fn parse_listing(url: &str, value: serde_json::Value) -> Result<Listing, ListingError> {
    if !value.is_array() {
        return Err(ListingError::malformed(url, "expected a JSON array of entries"));
    }
    let raw: Vec<RawEntry> = serde_json::from_value(value)
        .map_err(|e| ListingError::malformed(url, format!("invalid entry: {e}")))?;

    let mut listing = Listing::default();
    for (index, entry) in raw.into_iter().enumerate() {
        match validate_entry(url, index, entry)? {
            Some(entry) => listing.entries.push(entry),
            None => listing.skipped += 1,
        }
    }
    Ok(listing)
}

fn validate_entry(
    url: &str,
    index: usize,
    raw: RawEntry,
) -> Result<Option<DirectoryEntry>, ListingError> {
    let Some(kind) = raw.kind else {
        return Err(ListingError::malformed(
            url,
            format!("entry {index} has no `type`"),
        ));
    };
    let Some(name) = raw.name else {
        return Err(ListingError::malformed(
            url,
            format!("entry {index} has no `name`"),
        ));
    };
    validate_name(url, &name)?;

    match kind.as_str() {
        "file" => {
            let download_url = required_url(url, &name, "download_url", raw.download_url)?;
            Ok(Some(DirectoryEntry::File { name, download_url }))
        }
        "dir" => {
            let listing_url = required_url(url, &name, "url", raw.url)?;
            Ok(Some(DirectoryEntry::Directory { name, listing_url }))
        }
        other => {
            warn!(listing = %url, entry = %name, kind = %other, "skipping unsupported entry type");
            Ok(None)
        }
    }
}

fn validate_name(url: &str, name: &str) -> Result<(), ListingError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(ListingError::malformed(
            url,
            format!("entry name {name:?} is not a single path component"),
        ));
    }
    Ok(())
}

fn required_url(
    url: &str,
    name: &str,
    field: &str,
    value: Option<String>,
) -> Result<String, ListingError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Err(ListingError::malformed(
            url,
            format!("entry {name:?} has no `{field}`"),
        ));
    };
    Url::parse(&value).map_err(|e| {
        ListingError::malformed(url, format!("entry {name:?} has invalid `{field}`: {e}"))
    })?;
    Ok(value)
}
