//! In-process backend, for tests and offline use of the CLI
//!
//! Likes are kept as a `(user, post)` membership set, so a like change is an
//! idempotent upsert/delete. Failures and latency can be injected to exercise
//! the reconciler's rollback paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use itertools::Itertools as _;
use noodles_core::{LikeEntry, Post, PostFilter, PostId, Task, Timestamp, UserId, Viewer};
use snafu::ensure;
use tracing::debug;

use crate::api::{LikeIntent, LikeLedger, PostStore};
use crate::avatar::AvatarResolver;
use crate::error::{NetworkSnafu, RejectedSnafu, RemoteResult};

const LOG_TARGET: &str = "noodles::memory";

#[derive(Debug, Clone)]
struct Profile {
    display_name: String,
    avatar_key: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryBackendInner {
    profiles: BTreeMap<UserId, Profile>,
    /// Posts without their `liked_by`, which is joined in on fetch
    posts: BTreeMap<PostId, Post>,
    /// Likers of each post, in the order they liked it
    likes: BTreeMap<PostId, Vec<UserId>>,

    fail_toggles: usize,
    fail_fetches: usize,
    reject_toggles: Option<String>,
    latency: Duration,
    toggle_calls: usize,
}

impl MemoryBackendInner {
    fn liked_by(&self, post_id: PostId, avatars: &AvatarResolver) -> Vec<LikeEntry> {
        self.likes
            .get(&post_id)
            .into_iter()
            .flatten()
            .map(|user_id| {
                let profile = self.profiles.get(user_id);
                avatars.resolve_entry(LikeEntry {
                    user_id: *user_id,
                    display_name: profile
                        .map(|p| p.display_name.clone())
                        .unwrap_or_else(|| user_id.to_string()),
                    avatar_ref: profile.and_then(|p| p.avatar_key.clone()),
                })
            })
            .collect()
    }
}

pub struct MemoryBackend {
    inner: Mutex<MemoryBackendInner>,
    avatars: AvatarResolver,
}

impl MemoryBackend {
    pub fn new(avatars: AvatarResolver) -> Self {
        Self {
            inner: Mutex::default(),
            avatars,
        }
    }

    /// A small, fixed community to play with
    pub fn demo(avatars: AvatarResolver) -> Self {
        let backend = Self::new(avatars);

        backend.add_user(UserId(1), "penne", Some("1.png"));
        backend.add_user(UserId(2), "udon", None);
        backend.add_user(UserId(7), "ramen", Some("7.png"));

        let chores = [
            (40, 1, "Folded all the laundry", "Laundry", 10, 2),
            (41, 2, "Took out recycling before pickup", "Recycling", 5, 1),
            (42, 1, "Did the dishes after dinner", "Dishes", 5, 1),
            (43, 7, "Walked the neighbour's dog", "Helping out", 15, 3),
        ];
        for (i, (post_id, author_id, content, task, base_points, like_points)) in
            chores.into_iter().enumerate()
        {
            backend.add_post(
                Post::builder()
                    .id(PostId(post_id))
                    .author_id(UserId(author_id))
                    .content(content)
                    .created_at(Timestamp(1_759_536_000 + 3600 * i as u64))
                    .task(Task {
                        name: task.into(),
                        base_points,
                        like_points,
                    })
                    .build(),
            );
        }

        backend.add_like(UserId(2), PostId(40));
        backend.add_like(UserId(7), PostId(40));
        backend.add_like(UserId(1), PostId(43));

        backend
    }

    fn lock(&self) -> MutexGuard<'_, MemoryBackendInner> {
        self.inner.lock().expect("Locking failed")
    }

    pub fn add_user(&self, user_id: UserId, display_name: &str, avatar_key: Option<&str>) {
        self.lock().profiles.insert(
            user_id,
            Profile {
                display_name: display_name.to_owned(),
                avatar_key: avatar_key.map(ToOwned::to_owned),
            },
        );
    }

    /// Store `post`; any `liked_by` it carries is recorded as likes
    pub fn add_post(&self, mut post: Post) {
        let mut inner = self.lock();
        let likers = std::mem::take(&mut post.liked_by);
        let likes = inner.likes.entry(post.id).or_default();
        for entry in likers {
            if !likes.contains(&entry.user_id) {
                likes.push(entry.user_id);
            }
        }
        inner.posts.insert(post.id, post);
    }

    pub fn add_like(&self, user_id: UserId, post_id: PostId) {
        let mut inner = self.lock();
        let likes = inner.likes.entry(post_id).or_default();
        if !likes.contains(&user_id) {
            likes.push(user_id);
        }
    }

    /// Fail the next `count` like changes with a network error
    pub fn fail_next_toggles(&self, count: usize) {
        self.lock().fail_toggles = count;
    }

    /// Fail the next `count` fetches (of either kind) with a network error
    pub fn fail_next_fetches(&self, count: usize) {
        self.lock().fail_fetches = count;
    }

    /// Reject all like changes with `reason`, or stop rejecting with `None`
    pub fn reject_toggles(&self, reason: Option<&str>) {
        self.lock().reject_toggles = reason.map(ToOwned::to_owned);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Number of like changes received so far
    pub fn toggle_calls(&self) -> usize {
        self.lock().toggle_calls
    }

    /// Viewer of a registered user, with the avatar already resolved
    pub fn viewer(&self, user_id: UserId) -> Option<Viewer> {
        let inner = self.lock();
        let profile = inner.profiles.get(&user_id)?;
        Some(Viewer {
            user_id,
            display_name: profile.display_name.clone(),
            avatar_ref: self.avatars.resolve(profile.avatar_key.as_deref()),
        })
    }

    pub fn is_liked(&self, user_id: UserId, post_id: PostId) -> bool {
        self.lock()
            .likes
            .get(&post_id)
            .is_some_and(|likes| likes.contains(&user_id))
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_fetch_failure(&self) -> RemoteResult<()> {
        let mut inner = self.lock();
        if 0 < inner.fail_fetches {
            inner.fail_fetches -= 1;
            return NetworkSnafu {
                message: "injected fetch failure",
            }
            .fail();
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PostStore for MemoryBackend {
    async fn fetch_posts(&self, filter: PostFilter) -> RemoteResult<Vec<Post>> {
        self.simulate_latency().await;
        self.take_fetch_failure()?;

        let inner = self.lock();
        let posts: Vec<Post> = inner
            .posts
            .values()
            .filter(|post| filter.matches(post))
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            .map(|post| {
                let author = inner.profiles.get(&post.author_id);
                Post {
                    author_name: author.map(|p| p.display_name.clone()),
                    author_avatar: self
                        .avatars
                        .resolve(author.and_then(|p| p.avatar_key.as_deref())),
                    liked_by: inner.liked_by(post.id, &self.avatars),
                    ..post.clone()
                }
            })
            .collect();

        debug!(target: LOG_TARGET, ?filter, count = posts.len(), "Fetched posts");
        Ok(posts)
    }
}

#[async_trait::async_trait]
impl LikeLedger for MemoryBackend {
    async fn fetch_user_likes(&self, user_id: UserId) -> RemoteResult<BTreeSet<PostId>> {
        self.simulate_latency().await;
        self.take_fetch_failure()?;

        Ok(self
            .lock()
            .likes
            .iter()
            .filter(|(_, likers)| likers.contains(&user_id))
            .map(|(post_id, _)| *post_id)
            .collect())
    }

    async fn toggle_like(
        &self,
        user_id: UserId,
        post_id: PostId,
        intent: LikeIntent,
    ) -> RemoteResult<()> {
        self.lock().toggle_calls += 1;
        self.simulate_latency().await;

        let mut inner = self.lock();
        if 0 < inner.fail_toggles {
            inner.fail_toggles -= 1;
            return NetworkSnafu {
                message: "injected toggle failure",
            }
            .fail();
        }
        if let Some(reason) = inner.reject_toggles.clone() {
            return RejectedSnafu { reason }.fail();
        }

        let author_id = inner.posts.get(&post_id).map(|post| post.author_id);
        ensure!(
            author_id.is_some(),
            RejectedSnafu {
                reason: format!("no post {post_id}"),
            }
        );
        ensure!(
            author_id != Some(user_id),
            RejectedSnafu {
                reason: "can't like own post",
            }
        );

        let likes = inner.likes.entry(post_id).or_default();
        match intent {
            LikeIntent::Like => {
                if !likes.contains(&user_id) {
                    likes.push(user_id);
                }
            }
            LikeIntent::Unlike => likes.retain(|liker| *liker != user_id),
        }

        debug!(target: LOG_TARGET, %user_id, %post_id, %intent, "Applied like change");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
