//! Tests for eviction policies

use super::*;
use objacl_core::ObjectIdentity;

fn key(id: i64) -> ObjectIdentity {
    ObjectIdentity::new("Document", id).unwrap()
}

#[test]
fn test_lru_eviction() {
    let policy = LruPolicy::new(3);

    policy.on_insert(&key(1));
    policy.on_insert(&key(2));
    policy.on_insert(&key(3));
    assert_eq!(policy.next_eviction(3), None);

    policy.on_insert(&key(4));
    // Should evict 1 (least recently used)
    assert_eq!(policy.next_eviction(4), Some(key(1)));

    // Access 2 to make it more recent
    policy.on_access(&key(2));
    policy.on_remove(&key(1));
    policy.on_insert(&key(5));

    // Should evict 3 (now least recently used)
    assert_eq!(policy.next_eviction(4), Some(key(3)));
}

#[test]
fn test_unbounded_never_evicts() {
    let policy = create_eviction_policy(None);
    for id in 0..100 {
        policy.on_insert(&key(id));
    }
    assert_eq!(policy.next_eviction(100), None);
    assert_eq!(policy.capacity(), None);
}

#[test]
fn test_clear_resets_order() {
    let policy = create_eviction_policy(Some(1));
    policy.on_insert(&key(1));
    policy.on_insert(&key(2));
    policy.clear();
    assert_eq!(policy.next_eviction(2), None);
}
