//! Hybrid retrieval command

use anyhow::Result;
use memory_core::{Engine, RetrievalQuery};

use super::print_json;

pub async fn cmd_retrieve(
    engine: &Engine,
    query: String,
    limit: Option<i64>,
    cursor: Option<String>,
) -> Result<()> {
    let page = engine
        .retrieve(RetrievalQuery {
            query,
            limit,
            cursor,
            weights: None,
            extra: Default::default(),
        })
        .await?;
    print_json(&page)
}
