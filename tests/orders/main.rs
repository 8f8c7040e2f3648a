//! Integration tests for owners that declare a sort key and therefore share
//! a partition with their siblings.

mod models;

use models::{schema, Order, Promotion};
use single_table::{AttributeValue, InMemoryStore, Session, SortKeyCondition, StoreClient};

fn sort_keys(store: &InMemoryStore, partition: &str) -> Vec<String> {
    store
        .query(partition, &SortKeyCondition::All)
        .unwrap()
        .iter()
        .filter_map(|item| item.get("SK").and_then(AttributeValue::as_s))
        .map(str::to_string)
        .collect()
}

fn line_ids(order: &Order) -> Vec<&str> {
    order.lines.iter().map(|line| line.id.as_str()).collect()
}

fn seeded(orders: Vec<Order>) -> InMemoryStore {
    let store = InMemoryStore::new();
    let mut session = Session::new(schema(), store.clone());
    let mut set = session.set::<Order>().unwrap();
    for order in orders {
        set.add(order).unwrap();
    }
    session.save_changes().unwrap();
    store
}

#[test]
fn child_items_sit_under_their_owner_sort_key() {
    let store = seeded(vec![
        Order::new("c1", "o1").with_line("l1", "apple"),
        Order::new("c1", "o2").with_line("l2", "pear"),
    ]);

    assert_eq!(
        sort_keys(&store, "CUSTOMER#c1"),
        vec!["ORDER#o1", "ORDER#o1#LINE#l1", "ORDER#o2", "ORDER#o2#LINE#l2"]
    );
}

#[test]
fn loading_one_order_ignores_sibling_lines() {
    let store = seeded(vec![
        Order::new("c1", "o1").with_line("l1", "apple"),
        Order::new("c1", "o2").with_line("l2", "pear"),
    ]);

    let mut session = Session::new(schema(), store.clone());
    let mut orders = session.set::<Order>().unwrap();
    let o1 = orders.load("CUSTOMER#c1", "ORDER#o1").unwrap().unwrap();
    assert_eq!(line_ids(o1), vec!["l1"]);

    let key = orders.key("CUSTOMER#c1", "ORDER#o1");
    orders.remove(&key).unwrap();
    let summary = session.save_changes().unwrap();
    assert_eq!(summary.deletes, 2);

    assert_eq!(
        sort_keys(&store, "CUSTOMER#c1"),
        vec!["ORDER#o2", "ORDER#o2#LINE#l2"]
    );
}

#[test]
fn siblings_may_hold_children_with_the_same_identity() {
    let store = seeded(vec![
        Order::new("c1", "o1").with_line("l1", "apple"),
        Order::new("c1", "o2").with_line("l1", "pear"),
    ]);

    let mut session = Session::new(schema(), store);
    let mut orders = session.set::<Order>().unwrap();
    let outcome = orders.query("CUSTOMER#c1", SortKeyCondition::All).unwrap();
    assert!(outcome.failed.is_empty());
    assert_eq!(outcome.loaded.len(), 2);

    let skus: Vec<_> = outcome
        .loaded
        .iter()
        .map(|key| orders.get(key).unwrap())
        .map(|order| (order.id.as_str(), order.lines[0].sku.as_str()))
        .collect();
    assert_eq!(skus, vec![("o1", "apple"), ("o2", "pear")]);
}

#[test]
fn narrow_query_on_a_shared_partition_keeps_collections_apart() {
    let store = seeded(vec![
        Order::new("c1", "o1").with_line("l1", "apple"),
        Order::new("c1", "o2").with_line("l2", "pear"),
    ]);

    let mut session = Session::new(schema(), store.clone());
    let mut orders = session.set::<Order>().unwrap();
    let outcome = orders
        .query("CUSTOMER#c1", SortKeyCondition::Equals("ORDER#o2".into()))
        .unwrap();
    assert_eq!(outcome.loaded.len(), 1);
    assert_eq!(line_ids(orders.get(&outcome.loaded[0]).unwrap()), vec!["l2"]);

    let summary = session.save_changes().unwrap();
    assert_eq!(summary.puts + summary.deletes, 0);
    assert_eq!(sort_keys(&store, "CUSTOMER#c1").len(), 4);
}

#[test]
fn many_to_many_links_are_scoped_on_both_sides() {
    let store = InMemoryStore::new();
    let mut session = Session::new(schema(), store.clone());

    let mut order = Order::new("c1", "o1");
    order.promotions.push(Promotion::new("spring", "p1"));
    let mut orders = session.set::<Order>().unwrap();
    orders.add(order).unwrap();
    orders.add(Order::new("c1", "o2")).unwrap();
    let mut promotions = session.set::<Promotion>().unwrap();
    promotions.add(Promotion::new("spring", "p1")).unwrap();
    promotions.add(Promotion::new("spring", "p2")).unwrap();
    session.save_changes().unwrap();

    assert_eq!(
        sort_keys(&store, "CUSTOMER#c1"),
        vec!["ORDER#o1", "ORDER#o1#CAMPAIGN#spring#PROMO#p1", "ORDER#o2"]
    );
    assert_eq!(
        sort_keys(&store, "CAMPAIGN#spring"),
        vec!["PROMO#p1", "PROMO#p1#CUSTOMER#c1#ORDER#o1", "PROMO#p2"]
    );

    let mut session = Session::new(schema(), store);
    let mut orders = session.set::<Order>().unwrap();
    let o2 = orders.load("CUSTOMER#c1", "ORDER#o2").unwrap().unwrap();
    assert!(o2.promotions.is_empty());

    let mut promotions = session.set::<Promotion>().unwrap();
    let p1 = promotions.load("CAMPAIGN#spring", "PROMO#p1").unwrap().unwrap();
    assert_eq!(p1.orders.len(), 1);
    assert_eq!(p1.orders[0].id, "o1");
    let p2 = promotions.load("CAMPAIGN#spring", "PROMO#p2").unwrap().unwrap();
    assert!(p2.orders.is_empty());
}
