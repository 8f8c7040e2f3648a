//! Integration tests for optimistic locking and all-or-nothing saves.

mod models;

use std::sync::Arc;
use std::thread;

use models::{schema, Account, Counter};
use single_table::{
    AttributeValue, EntityState, InMemoryStore, MapperError, Session, StoreClient,
};

fn seeded() -> InMemoryStore {
    let store = InMemoryStore::new();
    let mut session = Session::new(schema(), store.clone());
    let mut accounts = session.set::<Account>().unwrap();
    accounts.add(Account::new("acc-1", "ada", 100)).unwrap();
    accounts.add(Account::new("acc-2", "bob", 50)).unwrap();
    session.set::<Counter>().unwrap().add(Counter { id: "hits".into(), hits: 0 }).unwrap();
    session.save_changes().unwrap();
    store
}

fn stored_version(store: &InMemoryStore, key: &str) -> AttributeValue {
    store.get(key, key).unwrap().unwrap()["__version"].clone()
}

#[test]
fn stale_session_loses_the_race() {
    let store = seeded();
    let mut first = Session::new(schema(), store.clone());
    let mut second = Session::new(schema(), store.clone());

    first
        .set::<Account>()
        .unwrap()
        .load("ACCOUNT#acc-1", "ACCOUNT#acc-1")
        .unwrap()
        .unwrap()
        .balance = 150;
    second
        .set::<Account>()
        .unwrap()
        .load("ACCOUNT#acc-1", "ACCOUNT#acc-1")
        .unwrap()
        .unwrap()
        .balance = 10;

    first.save_changes().unwrap();
    assert_eq!(stored_version(&store, "ACCOUNT#acc-1"), AttributeValue::N("2".into()));

    let err = second.save_changes().unwrap_err();
    assert_eq!(
        err,
        MapperError::ConcurrencyConflict {
            entity_type: "Account".into(),
            partition_key: "ACCOUNT#acc-1".into(),
            sort_key: "ACCOUNT#acc-1".into(),
        }
    );

    // Store keeps the winner's data; the loser's tracking is untouched.
    let stored = store.get("ACCOUNT#acc-1", "ACCOUNT#acc-1").unwrap().unwrap();
    assert_eq!(stored["balance"], AttributeValue::N("150".into()));
    assert_eq!(stored_version(&store, "ACCOUNT#acc-1"), AttributeValue::N("2".into()));

    let key = second.set::<Account>().unwrap().key("ACCOUNT#acc-1", "ACCOUNT#acc-1");
    assert_eq!(second.version(&key), Some(1));
    assert!(second.has_changes().unwrap());

    // Reloading with fresh data succeeds.
    second.clear();
    let mut accounts = second.set::<Account>().unwrap();
    let account = accounts
        .load("ACCOUNT#acc-1", "ACCOUNT#acc-1")
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 150);
    account.balance -= 140;
    second.save_changes().unwrap();
    assert_eq!(second.version(&key), Some(3));
}

#[test]
fn one_stale_entity_aborts_the_whole_unit() {
    let store = seeded();
    let before = store.items().unwrap();

    let mut transfer = Session::new(schema(), store.clone());
    let mut accounts = transfer.set::<Account>().unwrap();
    accounts
        .load("ACCOUNT#acc-1", "ACCOUNT#acc-1")
        .unwrap()
        .unwrap()
        .balance -= 30;
    accounts
        .load("ACCOUNT#acc-2", "ACCOUNT#acc-2")
        .unwrap()
        .unwrap()
        .balance += 30;
    accounts.add(Account::new("acc-3", "cy", 0)).unwrap();

    // Someone else touches the second account in between.
    let mut other = Session::new(schema(), store.clone());
    other
        .set::<Account>()
        .unwrap()
        .load("ACCOUNT#acc-2", "ACCOUNT#acc-2")
        .unwrap()
        .unwrap()
        .owner = "robert".into();
    other.save_changes().unwrap();
    let after_other = store.items().unwrap();
    assert_ne!(before, after_other);

    let err = transfer.save_changes().unwrap_err();
    match err {
        MapperError::ConcurrencyConflict { partition_key, .. } => {
            assert_eq!(partition_key, "ACCOUNT#acc-2")
        }
        other => panic!("unexpected error: {}", other),
    }

    assert_eq!(store.items().unwrap(), after_other);
    assert!(store.get("ACCOUNT#acc-3", "ACCOUNT#acc-3").unwrap().is_none());

    let accounts = transfer.set::<Account>().unwrap();
    let added = accounts.key("ACCOUNT#acc-3", "ACCOUNT#acc-3");
    assert_eq!(accounts.state(&added), Some(EntityState::Added));
}

#[test]
fn stale_delete_is_a_conflict() {
    let store = seeded();
    let mut deleter = Session::new(schema(), store.clone());
    let mut accounts = deleter.set::<Account>().unwrap();
    accounts
        .load("ACCOUNT#acc-1", "ACCOUNT#acc-1")
        .unwrap()
        .unwrap();
    let key = accounts.key("ACCOUNT#acc-1", "ACCOUNT#acc-1");
    accounts.remove(&key).unwrap();

    let mut writer = Session::new(schema(), store.clone());
    writer
        .set::<Account>()
        .unwrap()
        .load("ACCOUNT#acc-1", "ACCOUNT#acc-1")
        .unwrap()
        .unwrap()
        .balance = 0;
    writer.save_changes().unwrap();

    assert!(matches!(
        deleter.save_changes(),
        Err(MapperError::ConcurrencyConflict { .. })
    ));
    assert!(store.get("ACCOUNT#acc-1", "ACCOUNT#acc-1").unwrap().is_some());
    assert_eq!(deleter.state(&key), Some(EntityState::Deleted));
}

#[test]
fn shared_store_behind_arc() {
    let store = Arc::new(seeded());
    let mut session = Session::new(schema(), Arc::clone(&store));

    let mut counters = session.set::<Counter>().unwrap();
    counters
        .load("COUNTER#hits", "COUNTER#hits")
        .unwrap()
        .unwrap()
        .hits = 7;
    session.save_changes().unwrap();

    let stored = store.get("COUNTER#hits", "COUNTER#hits").unwrap().unwrap();
    assert_eq!(stored["hits"], AttributeValue::N("7".into()));
}

#[test]
fn concurrent_increments_retry_until_they_land() {
    let store = seeded();
    let schema = schema();
    let workers = 8;

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let store = store.clone();
            let schema = Arc::clone(&schema);
            thread::spawn(move || {
                let mut attempts = 0;
                loop {
                    attempts += 1;
                    let mut session = Session::new(Arc::clone(&schema), store.clone());
                    session
                        .set::<Counter>()
                        .unwrap()
                        .load("COUNTER#hits", "COUNTER#hits")
                        .unwrap()
                        .unwrap()
                        .hits += 1;
                    match session.save_changes() {
                        Ok(_) => return attempts,
                        Err(MapperError::ConcurrencyConflict { .. }) => continue,
                        Err(err) => panic!("unexpected error: {}", err),
                    }
                }
            })
        })
        .collect();

    let attempts: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(attempts >= workers);

    let stored = store.get("COUNTER#hits", "COUNTER#hits").unwrap().unwrap();
    assert_eq!(stored["hits"], AttributeValue::N(workers.to_string()));
    assert_eq!(
        stored["__version"],
        AttributeValue::N((workers + 1).to_string())
    );
}
