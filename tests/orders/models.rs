//! Orders and promotions that share partitions with their siblings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use single_table::{nav, Entity, SchemaBuilder, TableSchema};

/// Stored under the customer, one sort key per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
pub struct Order {
    pub customer: String,
    pub id: String,
    #[serde(skip)]
    pub lines: Vec<Line>,
    #[serde(skip)]
    pub promotions: Vec<Promotion>,
}

impl Order {
    pub fn new(customer: &str, id: &str) -> Self {
        Self {
            customer: customer.to_string(),
            id: id.to_string(),
            lines: Vec::new(),
            promotions: Vec::new(),
        }
    }

    pub fn with_line(mut self, id: &str, sku: &str) -> Self {
        self.lines.push(Line {
            id: id.to_string(),
            sku: sku.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
pub struct Line {
    pub id: String,
    pub sku: String,
}

/// Stored under the campaign, one sort key per code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
pub struct Promotion {
    pub campaign: String,
    pub code: String,
    #[serde(skip)]
    pub orders: Vec<Order>,
}

impl Promotion {
    pub fn new(campaign: &str, code: &str) -> Self {
        Self {
            campaign: campaign.to_string(),
            code: code.to_string(),
            orders: Vec::new(),
        }
    }
}

pub fn schema() -> Arc<TableSchema> {
    SchemaBuilder::new()
        .entity::<Order, _>(|order| {
            order
                .has_partition_key(|o: &Order| o.customer.clone(), "CUSTOMER")
                .has_sort_key(|o: &Order| o.id.clone(), "ORDER")
                .has_one_to_many(nav!(Order, lines))
                .has_many_to_many(nav!(Order, promotions))
                .has_versioning()
        })
        .entity::<Line, _>(|line| line.has_partition_key(|l: &Line| l.id.clone(), "LINE"))
        .entity::<Promotion, _>(|promotion| {
            promotion
                .has_partition_key(|p: &Promotion| p.campaign.clone(), "CAMPAIGN")
                .has_sort_key(|p: &Promotion| p.code.clone(), "PROMO")
                .has_many_to_many(nav!(Promotion, orders))
        })
        .compile()
        .unwrap()
}
