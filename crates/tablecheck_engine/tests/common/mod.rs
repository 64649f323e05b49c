//! Shared test fixtures: an in-memory executor that replays canned result
//! rows keyed by the exact compiled SQL.

use std::collections::HashMap;

use anyhow::anyhow;
use tablecheck_core::value::{RawCell, RawRow};
use tablecheck_engine::{DatasourceMap, QueryExecutor};

#[derive(Default)]
pub struct CannedDatasource {
    responses: HashMap<String, Vec<RawRow>>,
}

impl CannedDatasource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, sql: impl Into<String>, rows: Vec<RawRow>) -> Self {
        self.responses.insert(sql.into(), rows);
        self
    }
}

impl QueryExecutor for CannedDatasource {
    fn execute(&self, sql: &str) -> anyhow::Result<Vec<RawRow>> {
        self.responses
            .get(sql)
            .cloned()
            .ok_or_else(|| anyhow!("no canned response for query: {sql}"))
    }
}

pub fn single_datasource(name: &str, datasource: CannedDatasource) -> DatasourceMap {
    let mut map: DatasourceMap = HashMap::new();
    map.insert(name.to_string(), Box::new(datasource));
    map
}

pub fn int_rows(values: &[i64]) -> Vec<RawRow> {
    values.iter().map(|v| vec![RawCell::Integer(*v)]).collect()
}

pub fn text_rows(values: &[&str]) -> Vec<RawRow> {
    values
        .iter()
        .map(|v| vec![RawCell::Text(v.to_string())])
        .collect()
}
