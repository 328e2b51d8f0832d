mod cli;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cli::{FeedOpts, GlobalOpts, Opts, OptsCmd};
use noodles_client::avatar::AvatarResolver;
use noodles_client::error::LoadError;
use noodles_client::memory::MemoryBackend;
use noodles_client::{FeedView, LikeReconciler, PostView, ReconcilerConfig};
use noodles_core::{Timestamp, UserId};
use noodles_util_error::{FmtCompact as _, WhateverResult};
use noodles_util_fmt::{AsFmtOption as _, format_age_relative};
use serde_json::json;
use snafu::{FromString, OptionExt as _, ResultExt, Snafu, Whatever};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub const LOG_TARGET: &str = "noodles::cli";

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Miscellaneous error: {source}"))]
    Whatever { source: Whatever },
    #[snafu(display("Unknown viewer: {user_id}"))]
    UnknownViewer { user_id: UserId },
    #[snafu(display("Feed load error: {source}"))]
    Load { source: LoadError },
}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[snafu::report]
#[tokio::main]
async fn main() -> CliResult<()> {
    init_logging().context(WhateverSnafu)?;

    let opts = Opts::parse();
    let v = handle_cmd(opts).await?;
    println!("{}", serde_json::to_string_pretty(&v).expect("Can't fail"));
    Ok(())
}

async fn handle_cmd(opts: Opts) -> CliResult<serde_json::Value> {
    let backend = Arc::new(MemoryBackend::demo(AvatarResolver::new(
        opts.global.storage_url.clone(),
    )));

    Ok(match opts.cmd {
        OptsCmd::Feed(ref feed) => {
            let reconciler = load_reconciler(&opts.global, feed, &backend).await?;

            render_feed(&reconciler.view(), Timestamp::now())
        }
        OptsCmd::Toggle {
            ref feed,
            ref post_ids,
            fail,
            ref reject,
            latency_ms,
        } => {
            let reconciler = load_reconciler(&opts.global, feed, &backend).await?;
            let mut notices = reconciler.notices();

            backend.fail_next_toggles(fail);
            backend.reject_toggles(reject.as_deref());
            backend.set_latency(Duration::from_millis(latency_ms));

            let mut outcomes = vec![];
            for post_id in post_ids {
                match reconciler.toggle_like(*post_id).await {
                    Ok(state) => {
                        info!(target: LOG_TARGET, %post_id, ?state, "Toggled");
                        outcomes.push(json!({ "post_id": post_id, "state": state }));
                    }
                    Err(err) => {
                        outcomes.push(json!({
                            "post_id": post_id,
                            "error": err.fmt_compact().to_string(),
                            "retryable": err.is_retryable(),
                        }));
                    }
                }
            }

            let mut notice_list = vec![];
            while let Ok(notice) = notices.try_recv() {
                warn!(target: LOG_TARGET, notice = %notice.fmt_compact(), "Like change did not go through");
                notice_list.push(json!({
                    "post_id": notice.post_id(),
                    "message": notice.to_string(),
                }));
            }

            json!({
                "outcomes": outcomes,
                "notices": notice_list,
                "remote_calls": backend.toggle_calls(),
                "feed": render_feed(&reconciler.view(), Timestamp::now()),
            })
        }
    })
}

async fn load_reconciler(
    global: &GlobalOpts,
    feed: &FeedOpts,
    backend: &Arc<MemoryBackend>,
) -> CliResult<Arc<LikeReconciler>> {
    let viewer = backend.viewer(global.viewer).context(UnknownViewerSnafu {
        user_id: global.viewer,
    })?;
    info!(
        target: LOG_TARGET,
        viewer_id = %viewer.user_id,
        author = %feed.author.fmt_option(),
        avatar = %viewer.avatar_ref.fmt_option(),
        "Loading feed"
    );

    LikeReconciler::builder()
        .viewer(viewer)
        .post_store(backend.clone())
        .ledger(backend.clone())
        .filter(feed.filter())
        .config(
            ReconcilerConfig::builder()
                .remote_timeout(global.toggle_timeout())
                .resync_after_toggle(global.resync)
                .build(),
        )
        .load()
        .await
        .context(LoadSnafu)
}

fn render_feed(view: &FeedView, now: Timestamp) -> serde_json::Value {
    json!({
        "viewer_id": view.viewer_id,
        "liked": view.liked,
        "points_given": view.points_given(),
        "posts": view.posts.iter().map(|post| render_post(post, now)).collect::<Vec<_>>(),
    })
}

fn render_post(view: &PostView, now: Timestamp) -> serde_json::Value {
    let created_at = view.post.created_at;
    let age = format_age_relative(now.secs_since(created_at)).or_else(|| created_at.fmt_date());

    json!({
        "id": view.id(),
        "author_id": view.post.author_id,
        "author_name": view.post.author_name,
        "author_avatar": view.post.author_avatar,
        "content": view.post.content,
        "task": view.post.task,
        "age": age,
        "state": view.state,
        "liked": view.is_liked(),
        "like_count": view.like_count,
        "points": view.points,
        "liked_by": view.post.liked_by,
    })
}

pub fn init_logging() -> WhateverResult<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| Whatever::without_source("Failed to initialize logging".to_string()))?;

    Ok(())
}
