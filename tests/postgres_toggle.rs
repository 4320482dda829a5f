// Runs against a live PostgreSQL server; every test returns early unless
// DATABASE_URL points at one.

use std::sync::Arc;

use tuiter::{
    app_state::AppState,
    config::Config,
    core::{EntityId, NewTuit, RelationshipKind},
};

async fn postgres_state() -> Option<AppState> {
    let url = std::env::var("DATABASE_URL").ok()?;
    if !url.starts_with("postgres") {
        return None;
    }
    let mut config = Config::in_memory();
    config.database.url = url;
    config.database.max_connections = 4;
    Some(AppState::new(config).await.unwrap())
}

async fn tuit(state: &AppState) -> EntityId {
    let tuit = NewTuit {
        tuit: "contested".into(),
        posted_on: None,
    };
    let created = state.content.create_tuit(EntityId(1), &tuit).await;
    created.unwrap().id
}

#[tokio::test]
async fn test_postgres_toggle_transitions() {
    let Some(state) = postgres_state().await else {
        return;
    };
    let tid = tuit(&state).await;
    let toggles = &state.toggles;

    let liked = toggles.toggle_like(EntityId(2), tid).await.unwrap();
    assert!(liked.active);
    assert_eq!(liked.stats.likes, 1);
    assert_eq!(liked.stats.dislikes, 0);

    // A dislike replaces the like held by the same actor.
    let disliked = toggles.toggle_dislike(EntityId(2), tid).await.unwrap();
    assert!(disliked.active);
    assert_eq!(disliked.stats.likes, 0);
    assert_eq!(disliked.stats.dislikes, 1);

    let cleared = toggles.toggle_dislike(EntityId(2), tid).await.unwrap();
    assert!(!cleared.active);
    assert_eq!(cleared.stats.likes, 0);
    assert_eq!(cleared.stats.dislikes, 0);

    let queries = &state.queries;
    let likes = queries.count(RelationshipKind::Like, tid).await.unwrap();
    let dislikes = queries.count(RelationshipKind::Dislike, tid).await.unwrap();
    assert_eq!((likes, dislikes), (0, 0));
}

#[tokio::test]
async fn test_postgres_concurrent_toggles_match_rows() {
    let Some(state) = postgres_state().await else {
        return;
    };
    let state = Arc::new(state);
    let tid = tuit(&state).await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let actor = EntityId(10 + (i % 4));
                if i % 2 == 0 {
                    state.toggles.toggle_like(actor, tid).await
                } else {
                    state.toggles.toggle_dislike(actor, tid).await
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = state.content.find_tuit(tid).await.unwrap().unwrap().stats;
    let queries = &state.queries;
    let likes = queries.count(RelationshipKind::Like, tid).await.unwrap();
    let dislikes = queries.count(RelationshipKind::Dislike, tid).await.unwrap();
    assert_eq!(stats.likes, likes);
    assert_eq!(stats.dislikes, dislikes);

    for actor in 10..14 {
        let (like, dislike) = (RelationshipKind::Like, RelationshipKind::Dislike);
        let liked = queries.find_one(like, EntityId(actor), tid).await;
        let disliked = queries.find_one(dislike, EntityId(actor), tid).await;
        assert!(!(liked.unwrap().is_some() && disliked.unwrap().is_some()));
    }
}
