//! MediaWiki Action API client

use crate::sparql::SparqlClient;
use crate::{
    ClientError, ClientResult, SchemaSource, SourceRepository, TargetRepository, WikibaseConfig,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use kagami_core::{entity_from_json, Entity, EntityEdit, EntityId};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Client for one wikibase instance: Action API plus optional SPARQL endpoint
pub struct WikibaseClient {
    config: WikibaseConfig,
    client: reqwest::Client,
    sparql: Option<SparqlClient>,
    csrf_token: Mutex<Option<String>>,
}

impl WikibaseClient {
    pub fn new(config: WikibaseConfig) -> ClientResult<Self> {
        // cookie store carries the MediaWiki login session
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        let sparql = config
            .sparql_endpoint
            .as_deref()
            .map(|endpoint| SparqlClient::new(endpoint, config.timeout_seconds));
        Ok(Self {
            config,
            client,
            sparql,
            csrf_token: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &WikibaseConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((user, pass)) = &self.config.basic_auth {
            let credentials = general_purpose::STANDARD.encode(format!("{}:{}", user, pass));
            request.header("Authorization", format!("Basic {}", credentials))
        } else {
            request
        }
    }

    async fn api_get(&self, params: &[(&str, &str)]) -> ClientResult<Value> {
        let request = self
            .client
            .get(self.config.api_url())
            .query(params)
            .timeout(self.timeout());
        let response = self.authorize(request).send().await?;
        let body: Value = response.json().await?;
        check_api_error(&body)?;
        Ok(body)
    }

    async fn api_post(&self, form: &[(&str, &str)]) -> ClientResult<Value> {
        let request = self
            .client
            .post(self.config.api_url())
            .form(form)
            .timeout(self.timeout());
        let response = self.authorize(request).send().await?;
        let body: Value = response.json().await?;
        check_api_error(&body)?;
        Ok(body)
    }

    /// Log in with the configured bot credentials
    pub async fn login(&self) -> ClientResult<()> {
        let (Some(username), Some(password)) = (&self.config.username, &self.config.password)
        else {
            return Err(ClientError::Auth(
                "username and password required for login".to_string(),
            ));
        };
        let body = self
            .api_get(&[
                ("action", "query"),
                ("meta", "tokens"),
                ("type", "login"),
                ("format", "json"),
            ])
            .await?;
        let login_token = body["query"]["tokens"]["logintoken"]
            .as_str()
            .ok_or_else(|| ClientError::Auth("no login token in response".to_string()))?
            .to_string();

        let body = self
            .api_post(&[
                ("action", "login"),
                ("lgname", username),
                ("lgpassword", password),
                ("lgtoken", &login_token),
                ("format", "json"),
            ])
            .await?;
        match body["login"]["result"].as_str() {
            Some("Success") => {
                info!(user = %username, wiki = %self.config.base_url, "logged in");
                Ok(())
            }
            other => Err(ClientError::Auth(format!("login result {:?}", other))),
        }
    }

    /// CSRF token for write calls, logging in first when credentials exist
    async fn csrf_token(&self) -> ClientResult<String> {
        {
            let cached = self.csrf_token.lock().await;
            if let Some(token) = cached.as_ref() {
                return Ok(token.clone());
            }
        }
        if self.config.username.is_some() {
            self.login().await?;
        }
        let body = self
            .api_get(&[("action", "query"), ("meta", "tokens"), ("format", "json")])
            .await?;
        // "+\\" is the anonymous token MediaWiki hands out without a session
        let token = body["query"]["tokens"]["csrftoken"]
            .as_str()
            .unwrap_or("+\\")
            .to_string();
        *self.csrf_token.lock().await = Some(token.clone());
        Ok(token)
    }

    /// Numeric id of a namespace by its canonical name
    pub async fn namespace_id(&self, name: &str) -> ClientResult<Option<i64>> {
        let body = self
            .api_get(&[
                ("action", "query"),
                ("format", "json"),
                ("meta", "siteinfo"),
                ("formatversion", "2"),
                ("siprop", "namespaces"),
            ])
            .await?;
        if let Some(namespaces) = body["query"]["namespaces"].as_object() {
            for (id, namespace) in namespaces {
                if namespace["name"].as_str() == Some(name) {
                    return Ok(id.parse::<i64>().ok());
                }
            }
        }
        Ok(None)
    }

    /// Labels of every property on this instance, paged through
    /// `gapcontinue`. An empty wikibase yields an empty list.
    pub async fn list_property_labels(&self) -> ClientResult<Vec<String>> {
        let Some(namespace) = self.namespace_id("Property").await? else {
            return Ok(Vec::new());
        };
        let namespace = namespace.to_string();
        let mut labels = Vec::new();
        let mut gapcontinue: Option<String> = None;
        loop {
            let mut params = vec![
                ("action", "query"),
                ("format", "json"),
                ("prop", "pageterms"),
                ("generator", "allpages"),
                ("wbptterms", "label"),
                ("gapnamespace", namespace.as_str()),
            ];
            if let Some(cont) = &gapcontinue {
                params.push(("gapcontinue", cont.as_str()));
            }
            let body = self.api_get(&params).await?;
            if body.get("query").is_none() {
                break;
            }
            if let Some(pages) = body["query"]["pages"].as_object() {
                for page in pages.values() {
                    if let Some(list) = page["terms"]["label"].as_array() {
                        labels.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
                    }
                }
            }
            match body["continue"]["gapcontinue"].as_str() {
                Some(cont) => gapcontinue = Some(cont.to_string()),
                None => break,
            }
        }
        Ok(labels)
    }
}

#[async_trait]
impl SourceRepository for WikibaseClient {
    async fn fetch_entity(&self, id: &EntityId, languages: &[String]) -> ClientResult<Entity> {
        debug!(%id, "fetching entity");
        let langs = languages.join("|");
        let body = self
            .api_get(&[
                ("action", "wbgetentities"),
                ("format", "json"),
                ("ids", id.as_str()),
                ("languages", langs.as_str()),
            ])
            .await?;
        let entity = body
            .get("entities")
            .and_then(|entities| entities.get(id.as_str()))
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        if entity.get("missing").is_some() {
            return Err(ClientError::NotFound(id.clone()));
        }
        Ok(entity_from_json(entity)?)
    }

    async fn entity_uris(&self, query: &str) -> ClientResult<Vec<String>> {
        let Some(sparql) = &self.sparql else {
            return Err(ClientError::Config(
                "no SPARQL endpoint configured".to_string(),
            ));
        };
        let (vars, rows) = sparql.select(query).await?;
        let Some(first) = vars.first() else {
            return Ok(Vec::new());
        };
        Ok(rows.iter().filter_map(|row| row.get(first).cloned()).collect())
    }

    fn entity_uri(&self, id: &EntityId) -> String {
        self.config.entity_uri(id)
    }
}

#[async_trait]
impl TargetRepository for WikibaseClient {
    async fn write_entity(&self, edit: &EntityEdit) -> ClientResult<EntityId> {
        let token = self.csrf_token().await?;
        let data = edit.to_data_json().to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("action", "wbeditentity"),
            ("format", "json"),
            ("data", data.as_str()),
            ("token", token.as_str()),
        ];
        match &edit.id {
            Some(id) => form.push(("id", id.as_str())),
            None => form.push(("new", edit.kind.as_str())),
        }
        if edit.overwrite {
            form.push(("clear", "true"));
        }
        let body = self.api_post(&form).await?;
        let id = body["entity"]["id"].as_str().ok_or_else(|| ClientError::Api {
            code: "missing-entity".to_string(),
            message: "wbeditentity response without entity id".to_string(),
        })?;
        debug!(target = %id, "entity written");
        Ok(EntityId::new(id))
    }

    async fn search_property(
        &self,
        label: &str,
        language: &str,
    ) -> ClientResult<Option<EntityId>> {
        let body = self
            .api_get(&[
                ("action", "wbsearchentities"),
                ("format", "json"),
                ("search", label),
                ("language", language),
                ("type", "property"),
            ])
            .await?;
        if let Some(results) = body["search"].as_array() {
            for result in results {
                if result["label"].as_str() == Some(label) {
                    if let Some(id) = result["id"].as_str() {
                        return Ok(Some(EntityId::new(id)));
                    }
                }
            }
        }
        Ok(None)
    }

    async fn mapping_rows(
        &self,
        provenance_property: &EntityId,
    ) -> ClientResult<Vec<(EntityId, String)>> {
        let Some(sparql) = &self.sparql else {
            warn!("target has no SPARQL endpoint; starting with an empty mapping cache");
            return Ok(Vec::new());
        };
        let query = format!(
            "PREFIX wdt: <{}/prop/direct/>\nSELECT ?item ?source WHERE {{ ?item wdt:{} ?source . }}",
            self.config.base_url, provenance_property
        );
        let (_, rows) = sparql.select(&query).await?;
        let mut out = Vec::new();
        for row in rows {
            let (Some(item), Some(source)) = (row.get("item"), row.get("source")) else {
                continue;
            };
            if let Some(target) = EntityId::from_uri(item) {
                out.push((target, source.clone()));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SchemaSource for WikibaseClient {
    async fn fetch(&self, uri: &str) -> ClientResult<String> {
        let response = self
            .authorize(self.client.get(uri).timeout(self.timeout()))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Api {
                code: response.status().as_u16().to_string(),
                message: format!("schema fetch failed for {}", uri),
            });
        }
        Ok(response.text().await?)
    }
}

/// Map an Action API error body onto [`ClientError::Api`]. The first
/// message name is folded into the text because datatype rejections are
/// only identifiable through it.
fn check_api_error(body: &Value) -> ClientResult<()> {
    let Some(error) = body.get("error") else {
        return Ok(());
    };
    let code = error["code"].as_str().unwrap_or("unknown").to_string();
    let mut message = error["info"].as_str().unwrap_or_default().to_string();
    if let Some(name) = error["messages"][0]["name"].as_str() {
        message = format!("{} ({})", message, name);
    }
    Err(ClientError::Api { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_urls() {
        let config = WikibaseConfig::new("https://wikibase.example/");
        assert_eq!(config.api_url(), "https://wikibase.example/w/api.php");
        assert_eq!(
            config.entity_uri(&EntityId::new("Q5")),
            "https://wikibase.example/entity/Q5"
        );
    }

    #[test]
    fn test_api_error_carries_message_name() {
        let body = json!({
            "error": {
                "code": "failed-save",
                "info": "could not save",
                "messages": [{"name": "wikibase-api-not-recognized-datatype"}]
            }
        });
        let error = check_api_error(&body).unwrap_err();
        assert!(error.is_unrecognized_datatype());
    }

    #[test]
    fn test_plain_api_error_is_not_datatype_rejection() {
        let body = json!({
            "error": {"code": "badtoken", "info": "invalid CSRF token"}
        });
        let error = check_api_error(&body).unwrap_err();
        assert!(!error.is_unrecognized_datatype());
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let client = WikibaseClient::new(WikibaseConfig::new("https://wikibase.example")).unwrap();
        assert!(matches!(client.login().await, Err(ClientError::Auth(_))));
    }
}
