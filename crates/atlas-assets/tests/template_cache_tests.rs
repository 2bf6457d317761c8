// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Single-flight, retry and cancellation behaviour of the template cache.

use std::sync::Arc;

use atlas_assets::{FsResourceLoader, TemplateCache, TemplateLoadError};
use atlas_core::World;
use atlas_dry_tests::{straight_piece_json, GatedLoader, MemoryLoader, STRAIGHT_PIECE};
use futures_util::future::join_all;

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let loader = GatedLoader::new(MemoryLoader::new().with(STRAIGHT_PIECE, straight_piece_json()));
    let cache = TemplateCache::new(loader.clone(), 4);

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.load(STRAIGHT_PIECE).await })
        })
        .collect();
    loader.wait_for_fetches(1).await;
    loader.open();

    let results: Vec<_> = join_all(waiters)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    assert_eq!(loader.inner().fetch_count(STRAIGHT_PIECE), 1);
    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert!(cache.is_loaded(STRAIGHT_PIECE));

    // Served from the cache afterwards.
    cache.load(STRAIGHT_PIECE).await.unwrap();
    assert_eq!(loader.inner().fetch_count(STRAIGHT_PIECE), 1);
}

#[tokio::test]
async fn failures_are_shared_and_not_cached() {
    let loader = MemoryLoader::new().with(STRAIGHT_PIECE, straight_piece_json());
    loader.fail_next(STRAIGHT_PIECE, 1);
    let cache = TemplateCache::new(loader.clone(), 2);

    let err = cache.load(STRAIGHT_PIECE).await.unwrap_err();
    assert!(matches!(err, TemplateLoadError::Fetch { .. }));
    assert!(!cache.is_loaded(STRAIGHT_PIECE));

    let template = cache.load(STRAIGHT_PIECE).await.unwrap();
    assert_eq!(template.node_count(), 2);
    assert_eq!(loader.fetch_count(STRAIGHT_PIECE), 2);
}

#[tokio::test]
async fn decode_errors_surface_to_caller() {
    let loader = MemoryLoader::new().with("broken", b"{".to_vec());
    let cache = TemplateCache::new(loader, 1);
    assert!(matches!(
        cache.load("broken").await,
        Err(TemplateLoadError::Decode { .. })
    ));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn cancelling_one_waiter_leaves_others_intact() {
    let loader = GatedLoader::new(MemoryLoader::new().with(STRAIGHT_PIECE, straight_piece_json()));
    let cache = TemplateCache::new(loader.clone(), 1);

    let doomed = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.load(STRAIGHT_PIECE).await })
    };
    let survivor = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.load(STRAIGHT_PIECE).await })
    };
    loader.wait_for_fetches(1).await;
    // Give the survivor a turn to join the in-flight fetch.
    tokio::task::yield_now().await;
    doomed.abort();
    assert!(doomed.await.unwrap_err().is_cancelled());

    loader.open();
    let template = survivor.await.unwrap().unwrap();
    assert_eq!(template.name(), STRAIGHT_PIECE);
    assert_eq!(loader.inner().fetch_count(STRAIGHT_PIECE), 1);
}

#[tokio::test]
async fn dropping_every_waiter_cancels_the_fetch() {
    let loader = GatedLoader::new(MemoryLoader::new().with(STRAIGHT_PIECE, straight_piece_json()));
    let cache = TemplateCache::new(loader.clone(), 1);

    let only = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.load(STRAIGHT_PIECE).await })
    };
    loader.wait_for_fetches(1).await;
    only.abort();
    let _ = only.await;
    assert!(!cache.is_loaded(STRAIGHT_PIECE));

    // A fresh load starts a new fetch instead of joining the dead one, and the
    // permit held by the cancelled fetch has been released.
    loader.open();
    cache.load(STRAIGHT_PIECE).await.unwrap();
    assert_eq!(loader.inner().fetch_count(STRAIGHT_PIECE), 2);
}

#[tokio::test]
async fn abandoned_flight_leaves_no_entry_behind() {
    let loader = GatedLoader::new(MemoryLoader::new().with(STRAIGHT_PIECE, straight_piece_json()));
    let cache = TemplateCache::new(loader.clone(), 1);

    let only = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.load(STRAIGHT_PIECE).await })
    };
    loader.wait_for_fetches(1).await;
    assert_eq!(cache.pending(), 1);
    only.abort();
    assert!(only.await.unwrap_err().is_cancelled());
    assert_eq!(cache.pending(), 0, "cancelled flight must not linger");

    loader.open();
    cache.load(STRAIGHT_PIECE).await.unwrap();
    assert_eq!(cache.pending(), 0);
}

#[tokio::test]
async fn instantiate_clones_nodes_and_ports_into_world() {
    let loader = MemoryLoader::new().with(STRAIGHT_PIECE, straight_piece_json());
    let cache = TemplateCache::new(loader, 1);
    let mut world = World::new();
    assert!(cache.instantiate(STRAIGHT_PIECE, &mut world).is_none());

    cache.load(STRAIGHT_PIECE).await.unwrap();
    let first = cache.instantiate(STRAIGHT_PIECE, &mut world).unwrap();
    let second = cache.instantiate(STRAIGHT_PIECE, &mut world).unwrap();
    assert_ne!(first.root, second.root);
    assert_eq!(first.nodes.len(), 2);
    assert_eq!(first.ports.len(), 2);
    assert_eq!(world.scene().len(), 4);
    assert_eq!(world.connections().port_count(), 4);
    world.connect(first.ports[1], second.ports[0]).unwrap();
    assert_eq!(world.connections().chain(second.root), vec![first.root, second.root]);
}

#[tokio::test]
async fn fs_loader_reads_json_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("straight.json"), straight_piece_json()).unwrap();
    let cache = TemplateCache::new(FsResourceLoader::new(dir.path()), 2);

    assert_eq!(cache.load(STRAIGHT_PIECE).await.unwrap().node_count(), 2);
    assert_eq!(
        cache.load("missing").await.unwrap_err(),
        TemplateLoadError::NotFound("missing".into())
    );
    assert_eq!(
        cache.load("../etc/passwd").await.unwrap_err(),
        TemplateLoadError::InvalidName("../etc/passwd".into())
    );
}

#[tokio::test]
async fn evict_forces_a_fresh_fetch() {
    let loader = MemoryLoader::new().with(STRAIGHT_PIECE, straight_piece_json());
    let cache = TemplateCache::new(loader.clone(), 1);
    let before = cache.load(STRAIGHT_PIECE).await.unwrap();

    assert!(cache.evict(STRAIGHT_PIECE));
    assert!(!cache.evict(STRAIGHT_PIECE));
    assert!(cache.is_empty());

    let after = cache.load(STRAIGHT_PIECE).await.unwrap();
    assert_eq!(loader.fetch_count(STRAIGHT_PIECE), 2);
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(before, after);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn closed_cache_serves_loaded_templates_only() {
    let loader = MemoryLoader::new()
        .with(STRAIGHT_PIECE, straight_piece_json())
        .with("other", straight_piece_json());
    let cache = TemplateCache::new(loader.clone(), 1);
    cache.load(STRAIGHT_PIECE).await.unwrap();
    cache.close();

    assert!(cache.load(STRAIGHT_PIECE).await.is_ok());
    assert_eq!(cache.load("other").await.unwrap_err(), TemplateLoadError::Closed);
    assert_eq!(loader.fetch_count("other"), 0);
}
