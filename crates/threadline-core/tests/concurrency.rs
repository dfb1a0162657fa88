//! Concurrent callers sharing one service through an Arc

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use threadline_core::{
    ErrorKind, MemoryBackend, NewComment, NewPost, NewUser, ServiceConfig, ThreadService,
};

fn service() -> Arc<ThreadService> {
    Arc::new(ThreadService::new(
        Arc::new(MemoryBackend::new()),
        ServiceConfig::default(),
    ))
}

/// Many tasks race to claim one username; exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_username_race_has_single_winner() {
    let service = service();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.create_user(NewUser::new("alice")).await })
        })
        .collect();

    let results = tokio::time::timeout(Duration::from_secs(5), join_all(handles))
        .await
        .expect("racing creates should not hang");

    let mut winners = 0;
    for result in results {
        match result.expect("task panicked") {
            Ok(_) => winners += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
        }
    }
    assert_eq!(winners, 1);
}

/// Readers and writers interleave without losing comments.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_comments_are_all_listed() {
    let service = service();
    let alice = service.create_user(NewUser::new("alice")).await.unwrap();
    let post = service
        .create_post(NewPost::new("busy", "thread", &alice.id))
        .await
        .unwrap();

    let writers: Vec<_> = (0..20).map(|i| {
        let service = service.clone();
        let post_id = post.id.clone();
        let author = alice.id.clone();
        tokio::spawn(async move {
            service
                .create_comment(NewComment::new(post_id, author, format!("comment {i}")))
                .await
        })
    }).collect();
    let readers: Vec<_> = (0..20).map(|_| {
        let service = service.clone();
        let post_id = post.id.clone();
        tokio::spawn(async move {
            service
                .list_comments_by_post(&post_id, None, 0, 100)
                .await
                .map(|c| c.len())
        })
    }).collect();

    for result in join_all(writers).await {
        result.expect("writer panicked").unwrap();
    }
    for result in join_all(readers).await {
        let seen = result.expect("reader panicked").unwrap();
        assert!(seen <= 20);
    }

    let all = service
        .list_comments_by_post(&post.id, None, 0, 100)
        .await
        .unwrap();
    assert_eq!(all.len(), 20);
}
