use std::time::Duration;

use super::*;
use crate::foundation::core::Rgba8;
use crate::loader::source::MemoryAssetSource;
use crate::scene::model::Material;

fn path(s: &str) -> AssetPath {
    AssetPath::new(s).unwrap()
}

fn node(name: &str) -> SceneNode {
    SceneNode::mesh(name, Material::solid(Rgba8::WHITE))
}

fn queue(source: MemoryAssetSource) -> AssetLoadQueue {
    AssetLoadQueue::new(Arc::new(source), Some(4)).unwrap()
}

fn drain_all(q: &mut AssetLoadQueue) -> Vec<LoadCompletion> {
    let mut out = Vec::new();
    while let Some(c) = q.recv_timeout(Duration::from_secs(5)) {
        out.push(c);
    }
    out
}

#[test]
fn completions_carry_their_tickets() {
    let src = MemoryAssetSource::new()
        .with_delayed_model("a/slow", node("slow"), Duration::from_millis(80))
        .with_model("a/fast", node("fast"));
    let mut q = queue(src);
    let token = CancelToken::new();
    let slow = LoadTicket::Variant {
        kind: AccessoryKind::Candle,
        generation: 1,
        slot: 0,
    };
    let fast = LoadTicket::Variant {
        kind: AccessoryKind::Candle,
        generation: 1,
        slot: 1,
    };
    q.request_model(slow, path("a/slow"), token.clone());
    q.request_model(fast, path("a/fast"), token);

    let done = drain_all(&mut q);
    assert_eq!(done.len(), 2);
    assert_eq!(q.in_flight(), 0);
    for c in done {
        let LoadedAsset::Model(n) = c.result.unwrap() else {
            panic!("expected a model");
        };
        let expected = if c.ticket == slow { "slow" } else { "fast" };
        assert_eq!(n.name, expected);
    }
}

#[test]
fn failures_are_delivered_as_errors() {
    let mut q = queue(MemoryAssetSource::new());
    q.request_model(
        LoadTicket::Cake { generation: 3 },
        path("icing/round_vanilla"),
        CancelToken::new(),
    );
    q.request_image(
        LoadTicket::UploadedImage { generation: 3 },
        "uploads/missing.png".into(),
        CancelToken::new(),
    );
    let done = drain_all(&mut q);
    assert_eq!(done.len(), 2);
    assert!(done.iter().all(|c| matches!(c.result, Err(CakeError::Asset(_)))));
}

#[test]
fn cancelled_requests_are_never_delivered() {
    let src = MemoryAssetSource::new()
        .with_delayed_model("x", node("x"), Duration::from_millis(50))
        .with_model("y", node("y"));
    let mut q = queue(src);
    let stale = CancelToken::new();
    let live = CancelToken::new();
    q.request_model(LoadTicket::Cake { generation: 1 }, path("x"), stale.clone());
    stale.cancel();
    q.request_model(LoadTicket::Cake { generation: 2 }, path("y"), live);

    let done = drain_all(&mut q);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].ticket, LoadTicket::Cake { generation: 2 });
    assert_eq!(q.in_flight(), 0);
}

#[test]
fn recv_with_nothing_in_flight_returns_immediately() {
    let mut q = queue(MemoryAssetSource::new());
    assert!(q.recv_timeout(Duration::from_secs(60)).is_none());
    assert!(q.try_drain().is_empty());
}

#[test]
fn cancel_token_clones_share_state() {
    let a = CancelToken::new();
    let b = a.clone();
    assert!(!b.is_cancelled());
    a.cancel();
    assert!(b.is_cancelled());
}
