//! Read-only projection of the reconciler's cache, for the UI to bind to

use std::collections::BTreeSet;

use noodles_core::{Post, PostId, UserId};
use serde::Serialize;

/// Like state of a single post, from the viewer's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeState {
    NotLiked,
    Liked,
    /// Optimistically liked, awaiting confirmation
    PendingLike,
    /// Optimistically unliked, awaiting confirmation
    PendingUnlike,
}

impl LikeState {
    pub fn settled(is_liked: bool) -> Self {
        if is_liked { Self::Liked } else { Self::NotLiked }
    }

    /// Whether the heart should be drawn filled
    pub fn is_liked(self) -> bool {
        matches!(self, Self::Liked | Self::PendingLike)
    }

    /// State after the user toggles, `None` while a change is pending
    pub fn toggled(self) -> Option<Self> {
        match self {
            Self::NotLiked => Some(Self::PendingLike),
            Self::Liked => Some(Self::PendingUnlike),
            Self::PendingLike | Self::PendingUnlike => None,
        }
    }

    /// State once the pending change is confirmed (`true`) or failed
    pub fn resolved(self, confirmed: bool) -> Self {
        match (self, confirmed) {
            (Self::PendingLike, true) | (Self::PendingUnlike, false) => Self::Liked,
            (Self::PendingUnlike, true) | (Self::PendingLike, false) => Self::NotLiked,
            (settled, _) => settled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub post: Post,
    pub state: LikeState,
    pub like_count: usize,
    pub points: u64,
}

impl PostView {
    pub fn id(&self) -> PostId {
        self.post.id
    }

    pub fn is_liked(&self) -> bool {
        self.state.is_liked()
    }
}

/// Snapshot of the whole feed as the viewer currently sees it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FeedView {
    pub viewer_id: Option<UserId>,
    /// Posts the viewer likes, pending changes included
    pub liked: BTreeSet<PostId>,
    pub posts: Vec<PostView>,
}

impl FeedView {
    pub fn get(&self, post_id: PostId) -> Option<&PostView> {
        self.posts.iter().find(|view| view.post.id == post_id)
    }

    pub fn is_liked(&self, post_id: PostId) -> bool {
        self.liked.contains(&post_id)
    }

    /// Points the viewer gave away by liking, keyed off each post's task
    pub fn points_given(&self) -> u64 {
        self.posts
            .iter()
            .filter(|view| view.is_liked())
            .filter_map(|view| view.post.task.as_ref())
            .map(|task| u64::from(task.like_points))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_transitions() {
        use LikeState::*;

        assert_eq!(NotLiked.toggled(), Some(PendingLike));
        assert_eq!(Liked.toggled(), Some(PendingUnlike));
        assert_eq!(PendingLike.toggled(), None);
        assert_eq!(PendingUnlike.toggled(), None);

        assert_eq!(PendingLike.resolved(true), Liked);
        assert_eq!(PendingLike.resolved(false), NotLiked);
        assert_eq!(PendingUnlike.resolved(true), NotLiked);
        assert_eq!(PendingUnlike.resolved(false), Liked);
        assert_eq!(Liked.resolved(false), Liked);
    }

    #[test]
    fn pending_like_draws_filled_heart() {
        assert!(LikeState::PendingLike.is_liked());
        assert!(!LikeState::PendingUnlike.is_liked());
    }
}
