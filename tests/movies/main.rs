//! Integration tests for keys, relationship items and materialization.

mod models;

use models::{matrix, schema, Actor, Movie, Review};
use single_table::{
    AttributeValue, Document, Entity, EntityState, InMemoryStore, MapperError,
    MaterializeErrorKind, Session, SortKeyCondition, StoreClient,
};

fn seeded() -> InMemoryStore {
    let store = InMemoryStore::new();
    let mut session = Session::new(schema(), store.clone());
    session.set::<Movie>().unwrap().add(matrix()).unwrap();
    let mut actors = session.set::<Actor>().unwrap();
    actors.add(Actor::new("a1", "Keanu Reeves")).unwrap();
    actors.add(Actor::new("a2", "Carrie-Anne Moss")).unwrap();
    session.save_changes().unwrap();
    store
}

fn attr<'a>(item: &'a Document, name: &str) -> Option<&'a str> {
    item.get(name).and_then(AttributeValue::as_s)
}

fn link_items(store: &InMemoryStore) -> usize {
    store
        .items()
        .unwrap()
        .iter()
        .filter(|item| attr(item, "__rel") == Some("many_to_many"))
        .count()
}

#[test]
fn entity_type_comes_from_derive() {
    assert_eq!(Movie::ENTITY_TYPE, "Movie");
    assert_eq!(Actor::ENTITY_TYPE, "Actor");
    assert_eq!(Review::ENTITY_TYPE, "MovieReview");
}

#[test]
fn movie_round_trips_with_its_collections() {
    let store = seeded();
    let mut session = Session::new(schema(), store);

    let mut movies = session.set::<Movie>().unwrap();
    let loaded = movies.load("MOVIE#m1", "MOVIE#m1").unwrap().unwrap();
    assert_eq!(*loaded, matrix());

    let key = movies.key("MOVIE#m1", "MOVIE#m1");
    assert_eq!(movies.version(&key), Some(1));
    assert_eq!(movies.state(&key), Some(EntityState::Unchanged));
}

#[test]
fn root_and_child_items_share_the_partition() {
    let store = seeded();

    let partition = store.query("MOVIE#m1", &SortKeyCondition::All).unwrap();
    let sort_keys: Vec<_> = partition.iter().filter_map(|i| attr(i, "SK")).collect();
    assert_eq!(
        sort_keys,
        vec!["ACTOR#a1", "ACTOR#a2", "MOVIE#m1", "REVIEW#1"]
    );

    let review = &partition[3];
    assert_eq!(attr(review, "__type"), Some("MovieReview"));
    assert_eq!(attr(review, "__rel"), Some("one_to_many"));
    assert_eq!(attr(review, "__owner"), Some("Movie"));
    assert_eq!(attr(review, "text"), Some("Whoa"));

    let root = &partition[2];
    assert_eq!(attr(root, "GSI1PK"), Some("YEAR#1999"));
    assert_eq!(attr(root, "GSI1SK"), Some("TITLE#The Matrix"));
    assert!(!root.contains_key("cast"));
}

#[test]
fn many_to_many_link_items_are_symmetric() {
    let store = InMemoryStore::new();
    let mut session = Session::new(schema(), store.clone());
    let mut movie = matrix();
    movie.cast.truncate(1);
    movie.reviews.clear();
    let key = session.set::<Movie>().unwrap().add(movie).unwrap();
    session.save_changes().unwrap();

    assert_eq!(link_items(&store), 2);

    let from_movie = store
        .query("MOVIE#m1", &SortKeyCondition::BeginsWith("ACTOR#".into()))
        .unwrap();
    assert_eq!(from_movie.len(), 1);
    assert_eq!(attr(&from_movie[0], "name"), Some("Keanu Reeves"));

    let from_actor = store
        .query("ACTOR#a1", &SortKeyCondition::BeginsWith("MOVIE#".into()))
        .unwrap();
    assert_eq!(from_actor.len(), 1);
    assert_eq!(attr(&from_actor[0], "title"), Some("The Matrix"));
    assert_eq!(attr(&from_actor[0], "__owner"), Some("Actor"));

    session
        .set::<Movie>()
        .unwrap()
        .get_mut(&key)
        .unwrap()
        .cast
        .clear();
    session.save_changes().unwrap();

    assert_eq!(link_items(&store), 0);
    assert_eq!(session.version(&key), Some(2));
}

#[test]
fn query_regroups_a_mixed_partition() {
    let store = seeded();
    let mut session = Session::new(schema(), store);

    let mut movies = session.set::<Movie>().unwrap();
    let outcome = movies.query("MOVIE#m1", SortKeyCondition::All).unwrap();
    assert!(outcome.failed.is_empty());
    assert_eq!(outcome.loaded.len(), 1);

    let movie = movies.get(&outcome.loaded[0]).unwrap();
    assert_eq!(movie.cast.len(), 2);
    assert_eq!(movie.reviews[0].stars, 5);

    // The actor partition holds the actor and a link back to the movie.
    let mut actors = session.set::<Actor>().unwrap();
    let outcome = actors.query("ACTOR#a1", SortKeyCondition::All).unwrap();
    assert_eq!(outcome.loaded.len(), 1);
    assert_eq!(actors.get(&outcome.loaded[0]).unwrap().name, "Keanu Reeves");
}

#[test]
fn narrow_query_still_loads_whole_collections() {
    let store = seeded();
    let mut session = Session::new(schema(), store.clone());

    let mut movies = session.set::<Movie>().unwrap();
    let outcome = movies
        .query("MOVIE#m1", SortKeyCondition::Equals("MOVIE#m1".into()))
        .unwrap();
    assert_eq!(outcome.loaded.len(), 1);
    assert_eq!(movies.get(&outcome.loaded[0]).unwrap().cast.len(), 2);

    // Nothing changed, so nothing is written and no link is lost.
    assert_eq!(session.save_changes().unwrap().puts, 0);
    assert_eq!(link_items(&store), 4);
}

#[test]
fn index_query_finds_movies_by_year() {
    let store = seeded();
    let mut session = Session::new(schema(), store);

    let mut movies = session.set::<Movie>().unwrap();
    let outcome = movies
        .query_index(
            "GSI1",
            "YEAR#1999",
            SortKeyCondition::BeginsWith("TITLE#The".into()),
        )
        .unwrap();
    assert_eq!(outcome.loaded.len(), 1);
    assert_eq!(*movies.get(&outcome.loaded[0]).unwrap(), matrix());

    let none = movies
        .query_index("GSI1", "YEAR#2003", SortKeyCondition::All)
        .unwrap();
    assert!(none.loaded.is_empty());
}

#[test]
fn unreadable_item_is_reported_without_failing_the_batch() {
    let store = seeded();
    let mut broken = Document::new();
    for (name, value) in [
        ("PK", "MOVIE#bad"),
        ("SK", "MOVIE#bad"),
        ("__type", "Movie"),
        ("id", "bad"),
        ("title", "Broken"),
        ("year", "nineteen"),
        ("GSI1PK", "YEAR#1999"),
        ("GSI1SK", "TITLE#Broken"),
    ] {
        broken.insert(name.to_string(), AttributeValue::from(value));
    }
    store.put_raw(broken).unwrap();

    let mut session = Session::new(schema(), store);
    let mut movies = session.set::<Movie>().unwrap();
    let outcome = movies
        .query_index("GSI1", "YEAR#1999", SortKeyCondition::All)
        .unwrap();

    assert_eq!(outcome.loaded.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    let failure = &outcome.failed[0];
    assert_eq!(failure.entity_type, "Movie");
    assert_eq!(failure.item.as_deref(), Some("MOVIE#bad / MOVIE#bad"));
    assert!(matches!(failure.kind, MaterializeErrorKind::Decode(_)));
}

#[test]
fn deleting_a_movie_cascades_to_its_relationship_items() {
    let store = seeded();
    let mut session = Session::new(schema(), store.clone());

    let mut movies = session.set::<Movie>().unwrap();
    movies.load("MOVIE#m1", "MOVIE#m1").unwrap().unwrap();
    let key = movies.key("MOVIE#m1", "MOVIE#m1");
    movies.remove(&key).unwrap();
    assert_eq!(movies.state(&key), Some(EntityState::Deleted));
    assert!(movies.get(&key).is_none());

    let summary = session.save_changes().unwrap();
    assert_eq!(summary.deletes, 6);
    assert!(session.state(&key).is_none());

    // Only the two actor roots remain.
    let remaining = store.items().unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|item| attr(item, "__type") == Some("Actor")));
}

#[test]
fn adding_an_existing_key_is_a_conflict() {
    let store = seeded();
    let before = store.items().unwrap();
    let mut session = Session::new(schema(), store.clone());

    let key = session
        .set::<Movie>()
        .unwrap()
        .add(Movie::new("m1", "Impostor", 2020))
        .unwrap();
    let err = session.save_changes().unwrap_err();

    assert_eq!(
        err,
        MapperError::ConcurrencyConflict {
            entity_type: "Movie".into(),
            partition_key: "MOVIE#m1".into(),
            sort_key: "MOVIE#m1".into(),
        }
    );
    assert_eq!(session.state(&key), Some(EntityState::Added));
    assert_eq!(store.items().unwrap(), before);
}

#[test]
fn changing_a_key_attribute_moves_the_item() {
    let store = seeded();
    let mut session = Session::new(schema(), store.clone());

    let mut actors = session.set::<Actor>().unwrap();
    actors.load("ACTOR#a2", "ACTOR#a2").unwrap().unwrap().id = "a9".into();
    session.save_changes().unwrap();

    assert!(store.get("ACTOR#a2", "ACTOR#a2").unwrap().is_none());
    let moved = store.get("ACTOR#a9", "ACTOR#a9").unwrap().unwrap();
    assert_eq!(moved["__version"], AttributeValue::N("2".into()));

    let actors = session.set::<Actor>().unwrap();
    let old = actors.key("ACTOR#a2", "ACTOR#a2");
    let new = actors.key("ACTOR#a9", "ACTOR#a9");
    assert!(actors.state(&old).is_none());
    assert_eq!(actors.state(&new), Some(EntityState::Unchanged));
    assert_eq!(actors.get(&new).unwrap().name, "Carrie-Anne Moss");
}

#[test]
fn reserved_attribute_collision_is_rejected_on_add() {
    #[derive(Debug, serde::Serialize, serde::Deserialize, single_table::Entity)]
    struct Clash {
        id: String,
        #[serde(rename = "__version")]
        version: u64,
    }

    let schema = single_table::SchemaBuilder::new()
        .entity::<Clash, _>(|c| c.has_partition_key(|c: &Clash| c.id.clone(), "CLASH"))
        .compile()
        .unwrap();
    let mut session = Session::new(schema, InMemoryStore::new());

    let err = session
        .set::<Clash>()
        .unwrap()
        .add(Clash {
            id: "c".into(),
            version: 3,
        })
        .unwrap_err();
    match err {
        MapperError::Materialization(err) => assert_eq!(
            err.kind,
            MaterializeErrorKind::ReservedAttribute("__version".into())
        ),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn sessions_never_share_loaded_objects() {
    let store = seeded();
    let mut first = Session::new(schema(), store.clone());
    let mut second = Session::new(schema(), store.clone());

    let mut first_movies = first.set::<Movie>().unwrap();
    let movie = first_movies
        .load("MOVIE#m1", "MOVIE#m1")
        .unwrap()
        .unwrap();
    movie.title = "Reloaded".into();
    movie.cast.pop();

    let mut second_movies = second.set::<Movie>().unwrap();
    let other = second_movies
        .load("MOVIE#m1", "MOVIE#m1")
        .unwrap()
        .unwrap();
    assert_eq!(*other, matrix());
    assert!(!second.has_changes().unwrap());
    assert_eq!(link_items(&store), 4);
}
