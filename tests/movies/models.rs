//! Movie catalogue used by the integration tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use single_table::{nav, Entity, SchemaBuilder, TableSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub year: u16,
    #[serde(skip)]
    pub cast: Vec<Actor>,
    #[serde(skip)]
    pub reviews: Vec<Review>,
}

impl Movie {
    pub fn new(id: &str, title: &str, year: u16) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            year,
            cast: Vec::new(),
            reviews: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
#[entity(name = "MovieReview")]
pub struct Review {
    pub id: u32,
    pub stars: u8,
    pub text: String,
}

pub fn schema() -> Arc<TableSchema> {
    SchemaBuilder::new()
        .entity::<Movie, _>(|movie| {
            movie
                .has_partition_key(|m: &Movie| m.id.clone(), "MOVIE")
                .has_index_partition_key("GSI1", |m: &Movie| m.year, "YEAR")
                .has_index_sort_key("GSI1", |m: &Movie| m.title.clone(), "TITLE")
                .has_many_to_many(nav!(Movie, cast))
                .has_one_to_many(nav!(Movie, reviews))
                .has_versioning()
        })
        .entity::<Actor, _>(|actor| {
            actor
                .has_partition_key(|a: &Actor| a.id.clone(), "ACTOR")
                .has_versioning()
        })
        .entity::<Review, _>(|review| review.has_partition_key(|r: &Review| r.id, "REVIEW"))
        .compile()
        .unwrap()
}

/// The Matrix with two actors and one review.
pub fn matrix() -> Movie {
    let mut movie = Movie::new("m1", "The Matrix", 1999);
    movie.cast = vec![
        Actor::new("a1", "Keanu Reeves"),
        Actor::new("a2", "Carrie-Anne Moss"),
    ];
    movie.reviews = vec![Review {
        id: 1,
        stars: 5,
        text: "Whoa".to_string(),
    }];
    movie
}
