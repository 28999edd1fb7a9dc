//! SPARQL 1.1 query execution against a public endpoint (JSON results)

use crate::{ClientError, ClientResult};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// One result row: variable name to plain value
pub type SparqlRow = HashMap<String, String>;

/// Minimal SPARQL SELECT client
pub struct SparqlClient {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl SparqlClient {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Run a SELECT query; returns the projected variable names in order
    /// plus one map per result row
    pub async fn select(&self, query: &str) -> ClientResult<(Vec<String>, Vec<SparqlRow>)> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query), ("format", "json")])
            .header("Accept", "application/sparql-results+json")
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let code = response.status().as_u16().to_string();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { code, message });
        }

        let body: Value = response.json().await?;
        Ok(parse_results(&body))
    }
}

/// Parse a `application/sparql-results+json` document
pub fn parse_results(body: &Value) -> (Vec<String>, Vec<SparqlRow>) {
    let vars = body["head"]["vars"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut rows = Vec::new();
    if let Some(bindings) = body["results"]["bindings"].as_array() {
        for binding in bindings {
            let mut row = SparqlRow::new();
            if let Some(cells) = binding.as_object() {
                for (var, cell) in cells {
                    if let Some(value) = cell.get("value").and_then(Value::as_str) {
                        row.insert(var.clone(), value.to_string());
                    }
                }
            }
            rows.push(row);
        }
    }
    (vars, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_results() {
        let body = json!({
            "head": {"vars": ["item", "source"]},
            "results": {"bindings": [
                {
                    "item": {"type": "uri", "value": "http://target.example/entity/Q12"},
                    "source": {"type": "uri", "value": "http://www.wikidata.org/entity/Q42"}
                },
                {
                    "item": {"type": "uri", "value": "http://target.example/entity/Q13"}
                }
            ]}
        });
        let (vars, rows) = parse_results(&body);
        assert_eq!(vars, vec!["item", "source"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("source").map(String::as_str),
            Some("http://www.wikidata.org/entity/Q42")
        );
        assert!(rows[1].get("source").is_none());
    }

    #[test]
    fn test_parse_results_empty() {
        let (vars, rows) = parse_results(&json!({}));
        assert!(vars.is_empty());
        assert!(rows.is_empty());
    }
}
