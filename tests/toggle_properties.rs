use std::sync::Arc;

use tuiter::{
    app_state::AppState,
    config::Config,
    core::{EntityId, NewTuit, RelationshipKind},
};

fn file_config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::in_memory();
    config.database.url = format!("sqlite://{}", dir.path().join("tuiter.db").display());
    config.database.max_connections = 4;
    config
}

async fn tuit(state: &AppState) -> EntityId {
    state
        .content
        .create_tuit(
            EntityId(1),
            &NewTuit {
                tuit: "contested".into(),
                posted_on: None,
            },
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_stats_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let tid = {
        let state = AppState::new(file_config(&dir)).await.unwrap();
        let tid = tuit(&state).await;
        let toggles = &state.toggles;
        toggles.toggle_like(EntityId(2), tid).await.unwrap();
        toggles.toggle_dislike(EntityId(3), tid).await.unwrap();
        tid
    };

    let state = AppState::new(file_config(&dir)).await.unwrap();
    let stored = state.content.find_tuit(tid).await.unwrap().unwrap();
    assert_eq!(stored.stats.likes, 1);
    assert_eq!(stored.stats.dislikes, 1);
    assert!(state
        .queries
        .find_one(RelationshipKind::Like, EntityId(2), tid)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_concurrent_toggles_on_pooled_store() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(file_config(&dir)).await.unwrap());
    let tid = tuit(&state).await;

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let actor = EntityId(10 + (i % 3));
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

    for actor in 10..13 {
        let liked = state
            .queries
            .find_one(RelationshipKind::Like, EntityId(actor), tid)
            .await
            .unwrap();
        let disliked = state
            .queries
            .find_one(RelationshipKind::Dislike, EntityId(actor), tid)
            .await
            .unwrap();
        assert!(!(liked.is_some() && disliked.is_some()));
    }
}
