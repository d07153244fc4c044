//! Upstream editing service access.
//!
//! [`EditingClient`] is the seam between the editing flow and the network;
//! [`GraphQlEditingClient`] talks to the Sitecore GraphQL endpoint with
//! reqwest, tests substitute an in-memory client.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::value::RawValue;
use tracing::debug;

use crate::chrome::ChromeMarker;
use crate::config::EditingConfig;
use crate::error::LayoutError;

/// Everything needed to render one item in editing mode.
#[derive(Debug, Clone, PartialEq)]
pub struct EditingQuery {
    /// Item id or path.
    pub item: String,
    pub language: String,
    pub site_name: Option<String>,
    pub version: Option<u32>,
    pub dictionary_page_size: u32,
}

/// One page of the site dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryQuery {
    pub site_name: String,
    pub language: String,
    /// Cursor returned by the previous page.
    pub after: Option<String>,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DictionaryPage {
    pub entries: IndexMap<String, String>,
    pub end_cursor: Option<String>,
    pub has_next: bool,
}

/// The editing query's answer: layout JSON, chrome markers and the first
/// dictionary page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditingQueryResult {
    /// Layout service JSON text for the item, verbatim.
    pub layout: String,
    /// `None` when the service sent no marker list.
    pub chromes: Option<Vec<ChromeMarker>>,
    pub dictionary: DictionaryPage,
}

#[async_trait]
pub trait EditingClient: Send + Sync {
    /// Fetch the rendered layout for an item in editing mode.
    async fn editing_query(&self, query: &EditingQuery) -> Result<EditingQueryResult, LayoutError>;

    /// Fetch one further dictionary page.
    async fn dictionary_page(&self, query: &DictionaryQuery) -> Result<DictionaryPage, LayoutError>;
}

#[async_trait]
impl<C: EditingClient + ?Sized> EditingClient for Box<C> {
    async fn editing_query(&self, query: &EditingQuery) -> Result<EditingQueryResult, LayoutError> {
        (**self).editing_query(query).await
    }

    async fn dictionary_page(&self, query: &DictionaryQuery) -> Result<DictionaryPage, LayoutError> {
        (**self).dictionary_page(query).await
    }
}

// ============================================================================
// GRAPHQL CLIENT
// ============================================================================

const EDITING_QUERY: &str = r#"
query EditingQuery($itemId: String!, $language: String!, $version: String, $siteName: String, $hasSite: Boolean!, $pageSize: Int) {
  item(path: $itemId, language: $language, version: $version) {
    rendered
    chromes
  }
  site @include(if: $hasSite) {
    siteInfo(site: $siteName) {
      dictionary(language: $language, first: $pageSize) {
        pageInfo { endCursor hasNext }
        results { key value }
      }
    }
  }
}
"#;

const DICTIONARY_QUERY: &str = r#"
query DictionaryQuery($siteName: String!, $language: String!, $after: String, $pageSize: Int) {
  site {
    siteInfo(site: $siteName) {
      dictionary(language: $language, first: $pageSize, after: $after) {
        pageInfo { endCursor hasNext }
        results { key value }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct EditingData {
    #[serde(default)]
    item: Option<ItemData>,
    #[serde(default)]
    site: Option<SiteData>,
}

#[derive(Debug, Deserialize)]
struct DictionaryQueryData {
    #[serde(default)]
    site: Option<SiteData>,
}

#[derive(Debug, Deserialize)]
struct ItemData {
    #[serde(default)]
    rendered: Option<Box<RawValue>>,
    #[serde(default)]
    chromes: Option<Vec<ChromeMarker>>,
}

#[derive(Debug, Deserialize)]
struct SiteData {
    #[serde(default, rename = "siteInfo")]
    site_info: Option<SiteInfoData>,
}

#[derive(Debug, Deserialize)]
struct SiteInfoData {
    #[serde(default)]
    dictionary: Option<DictionaryData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DictionaryData {
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default)]
    results: Vec<DictionaryEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    end_cursor: Option<String>,
    #[serde(default)]
    has_next: bool,
}

#[derive(Debug, Deserialize)]
struct DictionaryEntry {
    key: String,
    #[serde(default)]
    value: String,
}

impl From<DictionaryData> for DictionaryPage {
    fn from(dictionary: DictionaryData) -> Self {
        DictionaryPage {
            entries: dictionary
                .results
                .into_iter()
                .map(|entry| (entry.key, entry.value))
                .collect(),
            end_cursor: dictionary.page_info.end_cursor,
            has_next: dictionary.page_info.has_next,
        }
    }
}

fn dictionary_of(site: Option<SiteData>) -> DictionaryPage {
    site.and_then(|s| s.site_info)
        .and_then(|info| info.dictionary)
        .map(DictionaryPage::from)
        .unwrap_or_default()
}

/// The dictionary selection is skipped when no site is known.
fn editing_variables(query: &EditingQuery) -> serde_json::Value {
    json!({
        "itemId": query.item,
        "language": query.language,
        "version": query.version.map(|v| v.to_string()),
        "siteName": query.site_name,
        "hasSite": query.site_name.is_some(),
        "pageSize": query.dictionary_page_size,
    })
}

/// Editing client for the Sitecore GraphQL endpoint.
pub struct GraphQlEditingClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl GraphQlEditingClient {
    pub fn new(config: &EditingConfig) -> Result<Self, LayoutError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LayoutError::transport_with("HTTP client error", e))?;
        Ok(Self::with_client(http_client, config.endpoint.clone()))
    }

    /// Use an existing reqwest client.
    pub fn with_client(http_client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, LayoutError> {
        debug!(endpoint = %self.endpoint, operation, "sending GraphQL request");
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| {
                LayoutError::transport_with(format!("{} request to {} failed", operation, self.endpoint), e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LayoutError::transport(format!(
                "{} request to {} failed: HTTP {}",
                operation, self.endpoint, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LayoutError::transport_with(format!("failed to read {} response", operation), e))?;
        let parsed: GraphQlResponse<T> = serde_json::from_str(&body)
            .map_err(|e| LayoutError::transport_with(format!("unreadable {} response", operation), e))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(LayoutError::transport(format!(
                "{} returned errors: {}",
                operation,
                messages.join("; ")
            )));
        }
        parsed
            .data
            .ok_or_else(|| LayoutError::transport(format!("{} response has no data", operation)))
    }
}

#[async_trait]
impl EditingClient for GraphQlEditingClient {
    async fn editing_query(&self, query: &EditingQuery) -> Result<EditingQueryResult, LayoutError> {
        let data: EditingData = self
            .post("EditingQuery", EDITING_QUERY, editing_variables(query))
            .await?;

        let item = data
            .item
            .ok_or_else(|| LayoutError::ItemNotFound(query.item.clone()))?;
        let layout = item
            .rendered
            .map(|raw| raw.get().to_string())
            .ok_or_else(|| LayoutError::ItemNotFound(query.item.clone()))?;

        Ok(EditingQueryResult {
            layout,
            chromes: item.chromes,
            dictionary: dictionary_of(data.site),
        })
    }

    async fn dictionary_page(&self, query: &DictionaryQuery) -> Result<DictionaryPage, LayoutError> {
        let variables = json!({
            "siteName": query.site_name,
            "language": query.language,
            "after": query.after,
            "pageSize": query.page_size,
        });
        let data: DictionaryQueryData = self.post("DictionaryQuery", DICTIONARY_QUERY, variables).await?;
        Ok(dictionary_of(data.site))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::post};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_editing_response_shape() {
        let body = r#"{
            "data": {
                "item": {
                    "rendered": {"sitecore": {"route": {"name": "home"}}},
                    "chromes": [{"chrometype": "placeholder", "kind": "open", "target": "main"}]
                },
                "site": {"siteInfo": {"dictionary": {
                    "pageInfo": {"endCursor": "c1", "hasNext": true},
                    "results": [{"key": "greeting", "value": "Hello"}]
                }}}
            }
        }"#;
        let parsed: GraphQlResponse<EditingData> = serde_json::from_str(body).unwrap();
        let data = parsed.data.unwrap();
        let item = data.item.unwrap();
        assert_eq!(
            item.rendered.unwrap().get(),
            r#"{"sitecore": {"route": {"name": "home"}}}"#
        );
        assert_eq!(item.chromes.unwrap(), vec![ChromeMarker::placeholder("main")]);

        let page = dictionary_of(data.site);
        assert_eq!(page.entries["greeting"], "Hello");
        assert_eq!(page.end_cursor.as_deref(), Some("c1"));
        assert!(page.has_next);
    }

    #[test]
    fn test_missing_dictionary_is_empty_page() {
        let parsed: GraphQlResponse<DictionaryQueryData> =
            serde_json::from_str(r#"{"data": {"site": null}}"#).unwrap();
        assert_eq!(dictionary_of(parsed.data.unwrap().site), DictionaryPage::default());
    }

    #[test]
    fn test_graphql_errors_are_read() {
        let parsed: GraphQlResponse<EditingData> =
            serde_json::from_str(r#"{"errors": [{"message": "boom"}], "data": null}"#).unwrap();
        assert!(parsed.data.is_none());
        assert_eq!(parsed.errors[0].message, "boom");
    }

    fn query(site_name: Option<&str>) -> EditingQuery {
        EditingQuery {
            item: "/home".into(),
            language: "en".into(),
            site_name: site_name.map(str::to_string),
            version: Some(2),
            dictionary_page_size: 100,
        }
    }

    #[test]
    fn test_variables_without_site_skip_dictionary() {
        assert_eq!(
            editing_variables(&query(None)),
            json!({
                "itemId": "/home",
                "language": "en",
                "version": "2",
                "siteName": null,
                "hasSite": false,
                "pageSize": 100,
            })
        );
        assert!(EDITING_QUERY.contains("$siteName: String,"));
        assert!(EDITING_QUERY.contains("site @include(if: $hasSite)"));
    }

    #[test]
    fn test_variables_with_site() {
        let variables = editing_variables(&query(Some("corporate")));
        assert_eq!(variables["siteName"], "corporate");
        assert_eq!(variables["hasSite"], true);
    }

    // ========================================================================
    // HTTP round trips against a local endpoint
    // ========================================================================

    async fn endpoint(status: StatusCode, body: &'static str) -> GraphQlEditingClient {
        let app = Router::new().route("/graphql", post(move || async move { (status, body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        let config = EditingConfig {
            endpoint: format!("http://{}/graphql", addr),
            ..EditingConfig::default()
        };
        GraphQlEditingClient::new(&config).unwrap()
    }

    async fn run_query(status: StatusCode, body: &'static str) -> Result<EditingQueryResult, LayoutError> {
        endpoint(status, body).await.editing_query(&query(None)).await
    }

    #[tokio::test]
    async fn test_http_status_is_transport_error() {
        let err = run_query(StatusCode::SERVICE_UNAVAILABLE, "down").await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_graphql_errors_are_transport_error() {
        let err = run_query(StatusCode::OK, r#"{"errors": [{"message": "boom"}], "data": null}"#)
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_data_is_transport_error() {
        let err = run_query(StatusCode::OK, r#"{"data": null}"#).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("no data"));
    }

    #[tokio::test]
    async fn test_missing_item_is_not_found() {
        let err = run_query(StatusCode::OK, r#"{"data": {"item": null}}"#).await.unwrap_err();
        assert!(err.is_item_not_found());

        let err = run_query(StatusCode::OK, r#"{"data": {"item": {"rendered": null}}}"#)
            .await
            .unwrap_err();
        assert!(err.is_item_not_found());
    }

    #[tokio::test]
    async fn test_rendered_layout_is_returned() {
        let result = run_query(
            StatusCode::OK,
            r#"{"data": {"item": {"rendered": {"sitecore": {"route": {"name": "home"}}}}}}"#,
        )
        .await
        .unwrap();
        assert_eq!(result.layout, r#"{"sitecore": {"route": {"name": "home"}}}"#);
        assert_eq!(result.chromes, None);
        assert_eq!(result.dictionary, DictionaryPage::default());
    }

    #[tokio::test]
    async fn test_dictionary_page_round_trip() {
        let client = endpoint(
            StatusCode::OK,
            r#"{"data": {"site": {"siteInfo": {"dictionary": {
                "pageInfo": {"endCursor": null, "hasNext": false},
                "results": [{"key": "readMore", "value": "Read more"}]
            }}}}}"#,
        )
        .await;
        let page = client
            .dictionary_page(&DictionaryQuery {
                site_name: "corporate".into(),
                language: "en".into(),
                after: Some("c1".into()),
                page_size: 100,
            })
            .await
            .unwrap();
        assert_eq!(page.entries["readMore"], "Read more");
        assert!(!page.has_next);
    }
}
