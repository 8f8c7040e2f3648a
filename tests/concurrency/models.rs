//! Versioned entities shared by the concurrency tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use single_table::{Entity, SchemaBuilder, TableSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
pub struct Account {
    pub id: String,
    pub owner: String,
    pub balance: i64,
}

impl Account {
    pub fn new(id: &str, owner: &str, balance: i64) -> Self {
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
pub struct Counter {
    pub id: String,
    pub hits: u64,
}

pub fn schema() -> Arc<TableSchema> {
    SchemaBuilder::new()
        .entity::<Account, _>(|account| {
            account
                .has_partition_key(|a: &Account| a.id.clone(), "ACCOUNT")
                .has_versioning()
        })
        .entity::<Counter, _>(|counter| {
            counter
                .has_partition_key(|c: &Counter| c.id.clone(), "COUNTER")
                .has_versioning()
        })
        .compile()
        .unwrap()
}
