use std::time::Duration;

use noodles_core::PostId;
use snafu::Snafu;

/// Failure of a call to the backend
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum RemoteError {
    #[snafu(display("Network error: {message}"))]
    Network { message: String },
    #[snafu(display("Rejected by backend: {reason}"))]
    Rejected { reason: String },
    #[snafu(display("No response after {}ms", after.as_millis()))]
    Timeout { after: Duration },
}

impl RemoteError {
    /// Worth retrying without any user involvement
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Outcome of a like toggle that did not go through
///
/// None of these are fatal: the cache is left exactly as it was before the
/// toggle, and the user can simply try again.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ToggleError {
    #[snafu(display("Can't like own post {post_id}"))]
    SelfLikeRejected { post_id: PostId },
    #[snafu(display("Post {post_id} is not loaded"))]
    UnknownPost { post_id: PostId },
    #[snafu(display("Post {post_id} already has a like change in flight"))]
    ToggleInFlight { post_id: PostId },
    #[snafu(display("Like change of post {post_id} failed"))]
    RemoteFailure {
        post_id: PostId,
        source: RemoteError,
    },
}

impl ToggleError {
    pub fn post_id(&self) -> PostId {
        match self {
            ToggleError::SelfLikeRejected { post_id }
            | ToggleError::UnknownPost { post_id }
            | ToggleError::ToggleInFlight { post_id }
            | ToggleError::RemoteFailure { post_id, .. } => *post_id,
        }
    }

    /// Whether the user should be offered to retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToggleError::RemoteFailure { .. } | ToggleError::ToggleInFlight { .. }
        )
    }
}

pub type ToggleResult<T> = std::result::Result<T, ToggleError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    #[snafu(display("Could not fetch posts"))]
    FetchPosts { source: RemoteError },
    #[snafu(display("Could not fetch likes"))]
    FetchLikes { source: RemoteError },
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AvatarUrlError {
    #[snafu(display("Storage url can't be a base: {url}"))]
    CannotBeABase { url: url::Url },
    #[snafu(display("Empty avatar key"))]
    EmptyKey,
}

pub type AvatarUrlResult<T> = std::result::Result<T, AvatarUrlError>;
