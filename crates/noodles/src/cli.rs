use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use noodles_client::config::DEFAULT_REMOTE_TIMEOUT;
use noodles_core::{PostFilter, PostId, UserId};
use url::Url;

/// Command line options for the Good Noodles CLI
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub cmd: OptsCmd,
}

/// Global options that apply across all commands
#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// User looking at the feed
    #[arg(long, env = "NOODLES_VIEWER", default_value = "7")]
    pub viewer: UserId,

    /// Base URL of the object storage serving avatars
    #[arg(
        long,
        env = "NOODLES_STORAGE_URL",
        default_value = "https://goodnoodles.supabase.co"
    )]
    pub storage_url: Url,

    /// Seconds a like change may take before it's rolled back
    #[arg(long, env = "NOODLES_TOGGLE_TIMEOUT_SECS")]
    pub toggle_timeout_secs: Option<u64>,

    /// Re-fetch the feed after every confirmed like change
    #[arg(long)]
    pub resync: bool,
}

impl GlobalOpts {
    pub fn toggle_timeout(&self) -> Duration {
        self.toggle_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REMOTE_TIMEOUT)
    }
}

#[derive(Debug, Subcommand)]
pub enum OptsCmd {
    /// Print the viewer's feed
    Feed(FeedOpts),

    /// Like or unlike posts, then print the outcomes and the resulting feed
    Toggle {
        #[command(flatten)]
        feed: FeedOpts,

        /// Posts to toggle, in order
        #[arg(required = true)]
        post_ids: Vec<PostId>,

        /// Fail this many like changes with a network error
        #[arg(long, default_value = "0")]
        fail: usize,

        /// Reject every like change with this reason
        #[arg(long)]
        reject: Option<String>,

        /// Simulated backend latency
        #[arg(long, default_value = "0")]
        latency_ms: u64,
    },
}

#[derive(Debug, Args)]
pub struct FeedOpts {
    /// Only show posts of this author
    #[arg(long)]
    pub author: Option<UserId>,
}

impl FeedOpts {
    pub fn filter(&self) -> PostFilter {
        self.author
            .map(PostFilter::ByAuthor)
            .unwrap_or_default()
    }
}
