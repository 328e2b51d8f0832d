//! Turning avatar object-storage keys into public URLs

use noodles_core::LikeEntry;
use snafu::{OptionExt as _, ensure};
use tracing::debug;
use url::Url;

use crate::error::{AvatarUrlResult, CannotBeABaseSnafu, EmptyKeySnafu};

const LOG_TARGET: &str = "noodles::avatar";

pub const DEFAULT_AVATAR_BUCKET: &str = "avatars";

/// Maps avatar keys to public object-storage URLs
///
/// Keys live under the `public/` prefix of the bucket, so key `7.png`
/// resolves to `<storage>/storage/v1/object/public/avatars/public/7.png`.
#[derive(Debug, Clone)]
pub struct AvatarResolver {
    storage_url: Url,
    bucket: String,
}

impl AvatarResolver {
    pub fn new(storage_url: Url) -> Self {
        Self {
            storage_url,
            bucket: DEFAULT_AVATAR_BUCKET.to_owned(),
        }
    }

    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..self
        }
    }

    pub fn public_url(&self, key: &str) -> AvatarUrlResult<Url> {
        let key_segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
        ensure!(!key_segments.is_empty(), EmptyKeySnafu);

        let mut url = self.storage_url.clone();
        url.path_segments_mut()
            .ok()
            .context(CannotBeABaseSnafu {
                url: self.storage_url.clone(),
            })?
            .pop_if_empty()
            .extend([
                "storage",
                "v1",
                "object",
                "public",
                self.bucket.as_str(),
                "public",
            ])
            .extend(key_segments);
        Ok(url)
    }

    /// Resolve a stored avatar reference for display
    ///
    /// Absolute `http(s)` URLs are passed through. Keys that can't be
    /// resolved are dropped, so the UI falls back to a placeholder.
    pub fn resolve(&self, avatar_ref: Option<&str>) -> Option<String> {
        let avatar_ref = avatar_ref?;
        if let Ok(url) = Url::parse(avatar_ref) {
            if matches!(url.scheme(), "http" | "https") {
                return Some(avatar_ref.to_owned());
            }
        }
        match self.public_url(avatar_ref) {
            Ok(url) => Some(url.into()),
            Err(err) => {
                debug!(target: LOG_TARGET, %avatar_ref, %err, "Dropping unresolvable avatar");
                None
            }
        }
    }

    pub fn resolve_entry(&self, entry: LikeEntry) -> LikeEntry {
        LikeEntry {
            avatar_ref: self.resolve(entry.avatar_ref.as_deref()),
            ..entry
        }
    }
}
