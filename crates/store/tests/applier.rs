#![forbid(unsafe_code)]

use std::time::Duration;

use ilm_core::{ClusterState, IndexMetadata};
use ilm_store::{spawn_applier, spawn_applier_from, MetadataUpdate};

#[tokio::test]
async fn publishes_coalesced_snapshot() {
    let (tx, handle) = spawn_applier(64);
    let mut rx = handle.subscribe_version();

    for i in 0..10 {
        let im = IndexMetadata::builder(format!("idx-{}", i % 3)).number_of_replicas(i).build().unwrap();
        tx.send(MetadataUpdate::PutIndex(im)).await.unwrap();
    }
    drop(tx);

    // the loop drains everything before it exits
    while rx.changed().await.is_ok() {}
    let snap = handle.current();
    assert_eq!(snap.metadata().index_count(), 3);
    assert_eq!(snap.metadata().index("idx-0").map(|i| i.number_of_replicas()), Some(9));
    assert!(snap.version >= 1);
}

#[tokio::test]
async fn seeded_state_is_visible_immediately() {
    let im = IndexMetadata::builder("idx1").build().unwrap();
    let initial = ClusterState::builder().version(41).put_index(im).build();
    let (tx, handle) = spawn_applier_from(initial, 8);
    assert_eq!(handle.current().version, 41);
    assert!(handle.current().metadata().index("idx1").is_some());

    let mut rx = handle.subscribe_version();
    tx.send(MetadataUpdate::RemoveIndex("idx1".into())).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), rx.changed()).await.expect("published").unwrap();
    assert_eq!(*rx.borrow(), 42);
    assert!(handle.current().metadata().index("idx1").is_none());
}
