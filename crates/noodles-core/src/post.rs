use crate::{PostId, Timestamp, UserId};

/// One user's like, denormalized into a post's liker list for display
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeEntry {
    pub user_id: UserId,
    pub display_name: String,
    /// Avatar reference
    ///
    /// An object-storage key as stored on the profile, or an already
    /// resolved public URL once it went through the post store.
    pub avatar_ref: Option<String>,
}

/// A task a user completed, as logged by a post
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub base_points: u32,
    /// Extra points the author earns for every like
    pub like_points: u32,
}

/// A user-submitted record of a completed task
///
/// `liked_by` holds at most one [`LikeEntry`] per user. Use
/// [`Post::add_like`] and [`Post::remove_like`] to keep it that way.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    /// Author's display name, joined in by the post store
    pub author_name: Option<String>,
    /// Author's avatar, resolved the same way as the likers' ones
    pub author_avatar: Option<String>,
    #[builder(into)]
    pub content: String,
    #[builder(default = Timestamp::now())]
    pub created_at: Timestamp,
    #[builder(default)]
    pub liked_by: Vec<LikeEntry>,
    pub task: Option<Task>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: UserId) -> bool {
        self.liked_by.iter().any(|entry| entry.user_id == user_id)
    }

    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }

    /// Append `entry` unless its user already likes the post
    ///
    /// Returns `true` if the entry was added.
    pub fn add_like(&mut self, entry: LikeEntry) -> bool {
        if self.is_liked_by(entry.user_id) {
            return false;
        }
        self.liked_by.push(entry);
        true
    }

    /// Remove the like of `user_id`, returns `true` if there was one
    pub fn remove_like(&mut self, user_id: UserId) -> bool {
        let len_before = self.liked_by.len();
        self.liked_by.retain(|entry| entry.user_id != user_id);
        self.liked_by.len() != len_before
    }

    /// Points the post is worth: the task's base points plus like points for
    /// every liker
    pub fn points(&self) -> u64 {
        let Some(task) = self.task.as_ref() else {
            return 0;
        };
        u64::from(task.base_points)
            + u64::from(task.like_points) * u64::try_from(self.liked_by.len()).unwrap_or(u64::MAX)
    }
}

/// Which posts to fetch from the post store
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostFilter {
    /// Global feed
    #[default]
    All,
    /// Posts of a single author
    ByAuthor(UserId),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::ByAuthor(author_id) => post.author_id == *author_id,
        }
    }
}

/// The authenticated user looking at the feed
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct Viewer {
    pub user_id: UserId,
    #[builder(into)]
    pub display_name: String,
    #[builder(into)]
    pub avatar_ref: Option<String>,
}

impl Viewer {
    pub fn like_entry(&self) -> LikeEntry {
        LikeEntry {
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            avatar_ref: self.avatar_ref.clone(),
        }
    }
}
