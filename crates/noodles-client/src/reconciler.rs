//! Optimistic like/unlike with rollback
//!
//! [`LikeReconciler`] is the single owner of a viewing session's like state:
//! the set of posts the viewer likes and the denormalized `liked_by` list of
//! every cached post. A toggle is applied locally right away, then exactly one
//! remote mutation is issued. If it fails (or times out) both the membership
//! and the liker list of the post are restored together from a snapshot, so
//! the two can never diverge.
//!
//! Views never mutate the cache. They bind to [`LikeReconciler::subscribe`]
//! and call [`LikeReconciler::toggle_like`] or [`LikeReconciler::on_toggle`].

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use backon::{BackoffBuilder as _, FibonacciBuilder};
use noodles_core::{LikeEntry, Post, PostFilter, PostId, UserId, Viewer};
use noodles_util_error::FmtCompact as _;
use snafu::{OptionExt as _, ResultExt as _, ensure};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::{LikeIntent, LikeLedger, PostStore};
use crate::config::ReconcilerConfig;
use crate::error::{
    FetchLikesSnafu, FetchPostsSnafu, LoadResult, RemoteResult, SelfLikeRejectedSnafu,
    TimeoutSnafu, ToggleError, ToggleInFlightSnafu, ToggleResult, UnknownPostSnafu,
};
use crate::view::{FeedView, LikeState, PostView};

const LOG_TARGET: &str = "noodles::reconciler";

/// A toggle awaiting the backend, with what's needed to undo it
#[derive(Debug)]
struct PendingToggle {
    /// `PendingLike` or `PendingUnlike`
    state: LikeState,
    was_liked: bool,
    liked_by: Vec<LikeEntry>,
}

impl PendingToggle {
    fn intent(&self) -> LikeIntent {
        LikeIntent::from_was_liked(self.was_liked)
    }
}

/// The cached, optimistically mutated copy of the backend state
#[derive(Debug)]
struct CacheState {
    /// Bumped every time the cache is replaced by a fresh fetch
    generation: u64,
    posts: Vec<Post>,
    liked: BTreeSet<PostId>,
    in_flight: HashMap<PostId, PendingToggle>,
}

impl CacheState {
    fn new(generation: u64, posts: Vec<Post>, liked: BTreeSet<PostId>) -> Self {
        Self {
            generation,
            posts,
            liked,
            in_flight: HashMap::new(),
        }
    }

    fn post(&self, post_id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == post_id)
    }

    fn like_state(&self, post_id: PostId) -> LikeState {
        self.in_flight
            .get(&post_id)
            .map(|pending| pending.state)
            .unwrap_or_else(|| LikeState::settled(self.liked.contains(&post_id)))
    }

    /// Apply the toggle locally, remembering what's needed to undo it
    fn begin_toggle(&mut self, viewer: &Viewer, post_id: PostId) -> ToggleResult<LikeIntent> {
        let post = self.post(post_id).context(UnknownPostSnafu { post_id })?;
        ensure!(
            post.author_id != viewer.user_id,
            SelfLikeRejectedSnafu { post_id }
        );

        let current = self.like_state(post_id);
        let state = current.toggled().context(ToggleInFlightSnafu { post_id })?;

        let was_liked = current.is_liked();
        let intent = LikeIntent::from_was_liked(was_liked);
        let liked_by = self.apply_intent(viewer, post_id, intent);
        self.in_flight.insert(
            post_id,
            PendingToggle {
                state,
                was_liked,
                liked_by,
            },
        );

        Ok(intent)
    }

    /// Apply `intent` to the viewer's membership and the post's likers,
    /// returning the likers as they were before
    fn apply_intent(
        &mut self,
        viewer: &Viewer,
        post_id: PostId,
        intent: LikeIntent,
    ) -> Vec<LikeEntry> {
        let Some(post) = self.posts.iter_mut().find(|post| post.id == post_id) else {
            return vec![];
        };
        let liked_by = post.liked_by.clone();

        match intent {
            LikeIntent::Like => {
                self.liked.insert(post_id);
                post.add_like(viewer.like_entry());
            }
            LikeIntent::Unlike => {
                self.liked.remove(&post_id);
                post.remove_like(viewer.user_id);
            }
        }

        liked_by
    }

    /// Settle a toggle: keep the optimistic state if `confirmed`, otherwise
    /// restore what the post looked like before it
    fn finish_toggle(&mut self, post_id: PostId, confirmed: bool) -> LikeState {
        let Some(pending) = self.in_flight.remove(&post_id) else {
            return self.like_state(post_id);
        };

        if !confirmed {
            if pending.was_liked {
                self.liked.insert(post_id);
            } else {
                self.liked.remove(&post_id);
            }
            if let Some(post) = self.posts.iter_mut().find(|post| post.id == post_id) {
                post.liked_by = pending.liked_by;
            }
        }

        pending.state.resolved(confirmed)
    }

    /// Swap in freshly fetched data
    ///
    /// Toggles still in flight stay pending: their change is applied on top
    /// of the fresh data, and undoing them restores the fresh data.
    fn replace(&mut self, viewer: &Viewer, posts: Vec<Post>, liked: BTreeSet<PostId>) {
        let in_flight = std::mem::take(&mut self.in_flight);
        *self = CacheState::new(self.generation.wrapping_add(1), posts, liked);

        for (post_id, pending) in in_flight {
            let was_liked = self.liked.contains(&post_id);
            let liked_by = self.apply_intent(viewer, post_id, pending.intent());
            self.in_flight.insert(
                post_id,
                PendingToggle {
                    state: pending.state,
                    was_liked,
                    liked_by,
                },
            );
        }
    }

    fn project(&self, viewer_id: UserId) -> FeedView {
        FeedView {
            viewer_id: Some(viewer_id),
            liked: self.liked.clone(),
            posts: self
                .posts
                .iter()
                .map(|post| PostView {
                    post: post.clone(),
                    state: self.like_state(post.id),
                    like_count: post.like_count(),
                    points: post.points(),
                })
                .collect(),
        }
    }
}

pub struct LikeReconciler {
    viewer: Viewer,
    filter: PostFilter,
    post_store: Arc<dyn PostStore>,
    ledger: Arc<dyn LikeLedger>,
    config: ReconcilerConfig,

    state: Mutex<CacheState>,

    /// Read-only projection of `state`, republished after every change
    view_tx: watch::Sender<FeedView>,
    /// User-facing signals about toggles that did not go through
    notice_tx: broadcast::Sender<ToggleError>,
}

#[bon::bon]
impl LikeReconciler {
    /// Fetch the posts matching `filter` and the viewer's likes, and start a
    /// reconciler over them
    #[builder(finish_fn(name = "load"))]
    pub async fn new(
        viewer: Viewer,
        post_store: Arc<dyn PostStore>,
        ledger: Arc<dyn LikeLedger>,
        #[builder(default)] filter: PostFilter,
        #[builder(default)] config: ReconcilerConfig,
    ) -> LoadResult<Arc<Self>> {
        let (posts, liked) = fetch_remote(
            post_store.as_ref(),
            ledger.as_ref(),
            viewer.user_id,
            filter,
            &config,
        )
        .await?;

        info!(
            target: LOG_TARGET,
            viewer_id = %viewer.user_id,
            posts = posts.len(),
            liked = liked.len(),
            "Loaded feed"
        );

        let state = CacheState::new(0, posts, liked);
        let (view_tx, _) = watch::channel(state.project(viewer.user_id));
        let (notice_tx, _) = broadcast::channel(config.notice_capacity.max(1));

        Ok(Arc::new(Self {
            viewer,
            filter,
            post_store,
            ledger,
            config,
            state: Mutex::new(state),
            view_tx,
            notice_tx,
        }))
    }
}

impl LikeReconciler {
    pub fn subscribe(&self) -> watch::Receiver<FeedView> {
        self.view_tx.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<ToggleError> {
        self.notice_tx.subscribe()
    }

    /// Current projection of the feed
    pub fn view(&self) -> FeedView {
        self.view_tx.borrow().clone()
    }

    pub fn like_state(&self, post_id: PostId) -> Option<LikeState> {
        let state = self.lock_state();
        state.post(post_id)?;
        Some(state.like_state(post_id))
    }

    pub fn liked_posts(&self) -> BTreeSet<PostId> {
        self.lock_state().liked.clone()
    }

    pub fn post(&self, post_id: PostId) -> Option<Post> {
        self.lock_state().post(post_id).cloned()
    }

    /// Toggle like on `post_id` without waiting for the outcome
    ///
    /// Outcomes are visible through [`Self::subscribe`] and [`Self::notices`].
    pub fn on_toggle(self: &Arc<Self>, post_id: PostId) {
        let reconciler = self.clone();
        tokio::spawn(async move {
            // Already logged and sent to notice subscribers
            let _ = reconciler.toggle_like(post_id).await;
        });
    }

    /// Toggle like on `post_id` and wait for the backend to confirm
    ///
    /// The local state changes before this suspends. On success the returned
    /// state is settled; on any error the cache is as it was before the call,
    /// and the error is also sent to [`Self::notices`] subscribers.
    #[instrument(target = "noodles::reconciler", skip(self), fields(viewer_id = %self.viewer.user_id))]
    pub async fn toggle_like(&self, post_id: PostId) -> ToggleResult<LikeState> {
        let res = self.toggle_like_inner(post_id).await;

        match &res {
            Ok(state) => {
                debug!(target: LOG_TARGET, %post_id, ?state, "Like change confirmed");
            }
            Err(err @ ToggleError::RemoteFailure { .. }) => {
                warn!(target: LOG_TARGET, %post_id, err = %err.fmt_compact(), "Like change failed, rolled back");
            }
            Err(err) => {
                debug!(target: LOG_TARGET, %post_id, err = %err.fmt_compact(), "Like change refused");
            }
        }

        if let Err(err) = &res {
            // No subscribers is fine
            let _ = self.notice_tx.send(err.clone());
        }

        res
    }

    async fn toggle_like_inner(&self, post_id: PostId) -> ToggleResult<LikeState> {
        let intent = {
            let mut state = self.lock_state();
            let intent = state.begin_toggle(&self.viewer, post_id)?;
            self.publish(&state);
            intent
        };

        debug!(target: LOG_TARGET, %post_id, %intent, "Sending like change");
        let res = self.send_toggle(post_id, intent).await;

        let settled = {
            let mut state = self.lock_state();
            let settled = state.finish_toggle(post_id, res.is_ok());
            self.publish(&state);
            settled
        };

        match res {
            Ok(()) => {
                if self.config.resync_after_toggle {
                    self.resync().await;
                    return Ok(self.like_state(post_id).unwrap_or(settled));
                }
                Ok(settled)
            }
            Err(source) => Err(ToggleError::RemoteFailure { post_id, source }),
        }
    }

    async fn send_toggle(&self, post_id: PostId, intent: LikeIntent) -> RemoteResult<()> {
        let timeout = self.config.remote_timeout;
        match tokio::time::timeout(
            timeout,
            self.ledger.toggle_like(self.viewer.user_id, post_id, intent),
        )
        .await
        {
            Ok(res) => res,
            Err(_elapsed) => TimeoutSnafu { after: timeout }.fail(),
        }
    }

    /// Discard the cache and fetch everything again
    ///
    /// Toggles still in flight stay pending, on top of the fresh data.
    pub async fn reload(&self) -> LoadResult<()> {
        let (posts, liked) = self.fetch().await?;
        let mut state = self.lock_state();
        self.replace_cache(&mut state, posts, liked);
        Ok(())
    }

    /// Best-effort reload after a confirmed toggle
    async fn resync(&self) {
        let generation = {
            let state = self.lock_state();
            if !state.in_flight.is_empty() {
                debug!(target: LOG_TARGET, "Skipping resync, like changes in flight");
                return;
            }
            state.generation
        };

        match self.fetch().await {
            Ok((posts, liked)) => {
                let mut state = self.lock_state();
                if state.generation != generation || !state.in_flight.is_empty() {
                    debug!(target: LOG_TARGET, "Dropping resync, cache changed meanwhile");
                    return;
                }
                self.replace_cache(&mut state, posts, liked);
            }
            Err(err) => {
                debug!(target: LOG_TARGET, err = %err.fmt_compact(), "Resync failed, keeping local state");
            }
        }
    }

    async fn fetch(&self) -> LoadResult<(Vec<Post>, BTreeSet<PostId>)> {
        fetch_remote(
            self.post_store.as_ref(),
            self.ledger.as_ref(),
            self.viewer.user_id,
            self.filter,
            &self.config,
        )
        .await
    }

    fn replace_cache(
        &self,
        state: &mut CacheState,
        posts: Vec<Post>,
        liked: BTreeSet<PostId>,
    ) {
        debug!(
            target: LOG_TARGET,
            generation = state.generation.wrapping_add(1),
            in_flight = state.in_flight.len(),
            posts = posts.len(),
            liked = liked.len(),
            "Replacing cache"
        );
        state.replace(&self.viewer, posts, liked);
        self.publish(state);
    }

    fn publish(&self, state: &CacheState) {
        self.view_tx.send_replace(state.project(self.viewer.user_id));
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().expect("Locking failed")
    }
}

fn load_backoff(config: &ReconcilerConfig) -> FibonacciBuilder {
    FibonacciBuilder::default()
        .with_min_delay(config.load_retry_delay)
        .with_max_times(config.load_retries)
        .with_jitter()
}

/// Call `fetch` until it succeeds, retrying transient failures with backoff
async fn retry_transient<T, F, Fut>(
    config: &ReconcilerConfig,
    what: &'static str,
    mut fetch: F,
) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut backoff = load_backoff(config).build();
    loop {
        let err = match fetch().await {
            Ok(v) => return Ok(v),
            Err(err) => err,
        };
        let Some(after) = backoff.next().filter(|_| err.is_transient()) else {
            return Err(err);
        };
        debug!(
            target: LOG_TARGET,
            what,
            err = %err.fmt_compact(),
            after_ms = after.as_millis(),
            "Fetch failed, retrying"
        );
        tokio::time::sleep(after).await;
    }
}

async fn fetch_remote(
    post_store: &dyn PostStore,
    ledger: &dyn LikeLedger,
    user_id: UserId,
    filter: PostFilter,
    config: &ReconcilerConfig,
) -> LoadResult<(Vec<Post>, BTreeSet<PostId>)> {
    let (posts, likes) = futures::future::join(
        retry_transient(config, "posts", || post_store.fetch_posts(filter)),
        retry_transient(config, "likes", || ledger.fetch_user_likes(user_id)),
    )
    .await;

    Ok((
        posts.context(FetchPostsSnafu)?,
        likes.context(FetchLikesSnafu)?,
    ))
}
