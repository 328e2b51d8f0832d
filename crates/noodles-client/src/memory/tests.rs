use url::Url;

use super::*;
use crate::error::RemoteError;

fn backend() -> MemoryBackend {
    MemoryBackend::demo(AvatarResolver::new(
        Url::parse("https://noodles.supabase.co").expect("Valid url"),
    ))
}

#[test_log::test(tokio::test)]
async fn fetches_newest_first() {
    let backend = backend();

    let posts = backend
        .fetch_posts(PostFilter::All)
        .await
        .expect("Fetch works");

    let ids: Vec<_> = posts.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![PostId(43), PostId(42), PostId(41), PostId(40)]);
}

#[test_log::test(tokio::test)]
async fn filters_by_author() {
    let backend = backend();

    let posts = backend
        .fetch_posts(PostFilter::ByAuthor(UserId(1)))
        .await
        .expect("Fetch works");

    assert!(posts.iter().all(|post| post.author_id == UserId(1)));
    assert_eq!(posts.len(), 2);
}

#[test_log::test(tokio::test)]
async fn joins_likers_with_resolved_avatars() {
    let backend = backend();

    let posts = backend
        .fetch_posts(PostFilter::All)
        .await
        .expect("Fetch works");
    let laundry = posts
        .iter()
        .find(|post| post.id == PostId(40))
        .expect("Post present");

    assert_eq!(laundry.liked_by.len(), 2);
    assert_eq!(laundry.liked_by[0].display_name, "udon");
    assert_eq!(laundry.liked_by[0].avatar_ref, None);
    assert_eq!(laundry.liked_by[1].display_name, "ramen");
    assert_eq!(
        laundry.liked_by[1].avatar_ref.as_deref(),
        Some("https://noodles.supabase.co/storage/v1/object/public/avatars/public/7.png")
    );
}

#[test_log::test(tokio::test)]
async fn joins_author_profile() {
    let backend = backend();

    let posts = backend
        .fetch_posts(PostFilter::ByAuthor(UserId(7)))
        .await
        .expect("Fetch works");

    assert_eq!(posts[0].author_name.as_deref(), Some("ramen"));
    assert_eq!(
        posts[0].author_avatar.as_deref(),
        Some("https://noodles.supabase.co/storage/v1/object/public/avatars/public/7.png")
    );

    let posts = backend
        .fetch_posts(PostFilter::ByAuthor(UserId(2)))
        .await
        .expect("Fetch works");
    assert_eq!(posts[0].author_name.as_deref(), Some("udon"));
    assert_eq!(posts[0].author_avatar, None);
}

#[test_log::test(tokio::test)]
async fn like_changes_are_idempotent() {
    let backend = backend();

    for _ in 0..2 {
        backend
            .toggle_like(UserId(2), PostId(42), LikeIntent::Like)
            .await
            .expect("Like works");
    }
    assert!(backend.is_liked(UserId(2), PostId(42)));
    assert_eq!(
        backend
            .fetch_posts(PostFilter::All)
            .await
            .expect("Fetch works")
            .iter()
            .find(|post| post.id == PostId(42))
            .expect("Post present")
            .like_count(),
        1
    );

    for _ in 0..2 {
        backend
            .toggle_like(UserId(2), PostId(42), LikeIntent::Unlike)
            .await
            .expect("Unlike works");
    }
    assert!(!backend.is_liked(UserId(2), PostId(42)));
    assert_eq!(backend.toggle_calls(), 4);
}

#[test_log::test(tokio::test)]
async fn rejects_self_like_and_unknown_posts() {
    let backend = backend();

    let self_like = backend
        .toggle_like(UserId(7), PostId(43), LikeIntent::Like)
        .await;
    assert!(matches!(self_like, Err(RemoteError::Rejected { .. })));

    let unknown = backend
        .toggle_like(UserId(7), PostId(99), LikeIntent::Like)
        .await;
    assert!(matches!(unknown, Err(RemoteError::Rejected { .. })));
}

#[test_log::test(tokio::test)]
async fn injected_failures_are_consumed() {
    let backend = backend();
    backend.fail_next_toggles(1);
    backend.fail_next_fetches(1);

    assert!(matches!(
        backend
            .toggle_like(UserId(7), PostId(42), LikeIntent::Like)
            .await,
        Err(RemoteError::Network { .. })
    ));
    assert!(!backend.is_liked(UserId(7), PostId(42)));
    backend
        .toggle_like(UserId(7), PostId(42), LikeIntent::Like)
        .await
        .expect("Second attempt works");

    assert!(backend.fetch_user_likes(UserId(7)).await.is_err());
    assert_eq!(
        backend
            .fetch_user_likes(UserId(7))
            .await
            .expect("Second fetch works"),
        BTreeSet::from([PostId(40), PostId(42)])
    );
}

#[test_log::test(tokio::test)]
async fn rejection_can_be_lifted() {
    let backend = backend();
    backend.reject_toggles(Some("maintenance"));

    assert!(matches!(
        backend
            .toggle_like(UserId(7), PostId(42), LikeIntent::Like)
            .await,
        Err(RemoteError::Rejected { reason }) if reason == "maintenance"
    ));

    backend.reject_toggles(None);
    backend
        .toggle_like(UserId(7), PostId(42), LikeIntent::Like)
        .await
        .expect("Works again");
}

#[test]
fn viewer_matches_joined_like_entry() {
    let backend = backend();

    let viewer = backend.viewer(UserId(7)).expect("Known user");

    assert_eq!(viewer.display_name, "ramen");
    assert_eq!(
        viewer.avatar_ref.as_deref(),
        Some("https://noodles.supabase.co/storage/v1/object/public/avatars/public/7.png")
    );
    assert!(backend.viewer(UserId(1000)).is_none());
}
