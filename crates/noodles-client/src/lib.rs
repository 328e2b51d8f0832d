pub mod api;
pub mod avatar;
pub mod config;
pub mod error;
pub mod memory;
pub mod reconciler;
pub mod view;

pub use api::{LikeIntent, LikeLedger, PostStore};
pub use config::ReconcilerConfig;
pub use reconciler::LikeReconciler;
pub use view::{FeedView, LikeState, PostView};
