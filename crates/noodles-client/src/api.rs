//! Backend collaborators the reconciler talks to
//!
//! Implemented by whatever client library fronts the hosted backend, and by
//! [`crate::memory::MemoryBackend`] for tests and the CLI.

use std::collections::BTreeSet;
use std::fmt;

use noodles_core::{Post, PostFilter, PostId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::RemoteResult;

/// The end state a like mutation asks for
///
/// Derived from the state the client saw before the toggle, so the backend
/// learns both the prior state and the intended one, and can apply it as an
/// idempotent upsert/delete of the `(user, post)` row instead of a blind flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeIntent {
    Like,
    Unlike,
}

impl LikeIntent {
    pub fn from_was_liked(was_liked: bool) -> Self {
        if was_liked { Self::Unlike } else { Self::Like }
    }
}

impl fmt::Display for LikeIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LikeIntent::Like => "like",
            LikeIntent::Unlike => "unlike",
        })
    }
}

#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    /// Fetch posts matching `filter`, newest first
    ///
    /// Every post comes with its full `liked_by` list, avatar references
    /// already resolved to public URLs.
    async fn fetch_posts(&self, filter: PostFilter) -> RemoteResult<Vec<Post>>;
}

#[async_trait::async_trait]
pub trait LikeLedger: Send + Sync {
    /// All posts `user_id` currently likes
    async fn fetch_user_likes(&self, user_id: UserId) -> RemoteResult<BTreeSet<PostId>>;

    /// Record a like change of `user_id` on `post_id`
    async fn toggle_like(
        &self,
        user_id: UserId,
        post_id: PostId,
        intent: LikeIntent,
    ) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_carries_prior_state() {
        assert_eq!(LikeIntent::from_was_liked(false), LikeIntent::Like);
        assert_eq!(LikeIntent::from_was_liked(true), LikeIntent::Unlike);
        assert_eq!(LikeIntent::Unlike.to_string(), "unlike");
    }
}
