//! Property-based tests for `RecordStore`
//!
//! Invariants that must hold for all inputs: contiguous per-owner indices,
//! exact version arithmetic, frozen deleted records, and delegate-gated reads.

use inkvault_core::{
    AccessPolicy, Account, CallContext, ContentHash, StoreError, Timestamp,
};
use inkvault_ledger::{DEFAULT_MAX_CIPHERTEXT_LEN, MemoryStorage, RecordStore};
use proptest::prelude::*;

fn store() -> RecordStore<MemoryStorage> {
    RecordStore::new(MemoryStorage::new(), AccessPolicy::default(), DEFAULT_MAX_CIPHERTEXT_LEN)
}

fn ctx(caller: Account) -> CallContext {
    CallContext::new(caller, Timestamp::At(1_700_000_000))
}

fn account() -> impl Strategy<Value = Account> {
    any::<[u8; 20]>().prop_map(Account::from_bytes)
}

fn ciphertext() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..128)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: creates yield indices 0..n at version 1 with matching hashes
    #[test]
    fn prop_create_assigns_contiguous_indices(
        owner in account(),
        blobs in prop::collection::vec(ciphertext(), 0..20),
    ) {
        let store = store();

        for (expected, blob) in blobs.iter().enumerate() {
            let event = store.create(&ctx(owner), blob.clone())?;
            prop_assert_eq!(event.event.index, expected as u64);
            prop_assert_eq!(event.event.version, 1);
        }

        let views = store.read_all(&ctx(owner), owner)?;
        prop_assert_eq!(views.len(), blobs.len());
        for (i, (view, blob)) in views.iter().zip(&blobs).enumerate() {
            prop_assert_eq!(view.index, i as u64);
            prop_assert_eq!(view.content_hash, ContentHash::of(blob));
            prop_assert!(!view.deleted);
        }
    }

    /// Property: k successful updates leave version k+1; a stale one changes nothing
    #[test]
    fn prop_updates_increment_by_one(
        owner in account(),
        edits in prop::collection::vec(ciphertext(), 1..10),
        stale_offset in 1u64..5,
    ) {
        let store = store();
        store.create(&ctx(owner), b"initial".to_vec())?;

        for (k, edit) in edits.iter().enumerate() {
            let version = store.update(&ctx(owner), 0, edit.clone(), k as u64 + 1)?;
            prop_assert_eq!(version, k as u64 + 2);
        }

        let before = store.read(&ctx(owner), owner, 0)?;
        let stale = before.version.saturating_sub(stale_offset);
        let result = store.update(&ctx(owner), 0, b"lost".to_vec(), stale);

        let is_conflict = matches!(result, Err(StoreError::VersionConflict { .. }));
        prop_assert!(is_conflict);
        prop_assert_eq!(store.read(&ctx(owner), owner, 0)?, before);
    }

    /// Property: nothing moves a deleted record
    #[test]
    fn prop_deleted_record_is_frozen(
        owner in account(),
        delegate in account(),
        edit in ciphertext(),
        guess in 0u64..10,
    ) {
        prop_assume!(owner != delegate);

        let store = store();
        store.create(&ctx(owner), b"keep".to_vec())?;
        store.delete(&ctx(owner), 0)?;
        let frozen = store.read(&ctx(owner), owner, 0)?;

        let update = store.update(&ctx(owner), 0, edit, guess);
        prop_assert_eq!(update, Err(StoreError::NotFound { owner, index: 0 }));
        prop_assert_eq!(
            store.delete(&ctx(owner), 0),
            Err(StoreError::AlreadyDeleted { owner, index: 0 })
        );
        let grant_rejected = matches!(
            store.grant_delegate(&ctx(owner), 0, delegate),
            Err(StoreError::NotFound { .. })
        );
        prop_assert!(grant_rejected);
        prop_assert_eq!(store.read(&ctx(owner), owner, 0)?, frozen);
    }

    /// Property: a delegate sees exactly the owner's tuple, only while granted
    #[test]
    fn prop_delegate_reads_follow_grants(
        owner in account(),
        delegate in account(),
        blob in ciphertext(),
    ) {
        prop_assume!(owner != delegate);

        let store = store();
        store.create(&ctx(owner), blob)?;

        let denied =
            matches!(store.read(&ctx(delegate), owner, 0), Err(StoreError::Unauthorized { .. }));
        prop_assert!(denied);

        store.grant_delegate(&ctx(owner), 0, delegate)?;
        prop_assert_eq!(store.read(&ctx(delegate), owner, 0)?, store.read(&ctx(owner), owner, 0)?);

        store.revoke_delegate(&ctx(owner), 0, delegate)?;
        let denied_again =
            matches!(store.read(&ctx(delegate), owner, 0), Err(StoreError::Unauthorized { .. }));
        prop_assert!(denied_again);
    }

    /// Property: one owner's writes never change another owner's records
    #[test]
    fn prop_owner_isolation(
        alice in account(),
        bob in account(),
        blobs in prop::collection::vec(ciphertext(), 1..8),
    ) {
        prop_assume!(alice != bob);

        let store = store();
        store.create(&ctx(alice), b"alice".to_vec())?;
        let snapshot = store.read_all(&ctx(alice), alice)?;

        for blob in blobs {
            store.create(&ctx(bob), blob.clone())?;
            let _ = store.update(&ctx(bob), 0, blob, 1);
            let _ = store.delete(&ctx(bob), 0);
        }

        prop_assert_eq!(store.read_all(&ctx(alice), alice)?, snapshot);
        prop_assert_eq!(store.record_count(alice)?, 1);
    }
}
