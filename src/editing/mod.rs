//! # Editing Flow
//!
//! Serves one item in editing mode: query the editing service, deserialize
//! the layout it renders, wrap the tree in chromes and fill in the site
//! dictionary.
//!
//! ```text
//! Uninitialized ─► Querying ─┬─► Decorating ─► Decorated
//!                            └─► ErrorCollected
//! ```
//!
//! Runtime failures (no language, upstream errors, timeouts) are collected
//! in [`EditingResponse::errors`]; only caller misuse is returned as `Err`.

mod client;

pub use client::{
    DictionaryPage, DictionaryQuery, EditingClient, EditingQuery, EditingQueryResult,
    GraphQlEditingClient,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use tracing::{debug, info, warn};

use crate::chrome::{ChromeFeed, inject_chromes};
use crate::config::EditingConfig;
use crate::error::LayoutError;
use crate::layout::{LayoutDeserializer, LayoutResponse};

/// Context key the dictionary is merged under.
pub const DICTIONARY_KEY: &str = "dictionary";

/// Stop following dictionary cursors after this many pages.
pub const MAX_DICTIONARY_PAGES: usize = 50;

/// An incoming request to render an item for editing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingRequest {
    /// Raw request path, e.g. `/about/team`.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_path: Option<String>,
    #[serde(default, alias = "sc_lang")]
    pub language: Option<String>,
    #[serde(default, alias = "sc_site")]
    pub site_name: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
}

impl EditingRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// The item to query: item id, then item path, then the raw path.
    pub fn item(&self) -> &str {
        non_empty(self.item_id.as_deref())
            .or_else(|| non_empty(self.item_path.as_deref()))
            .unwrap_or(&self.path)
    }

    pub fn resolved_language(&self) -> Option<&str> {
        non_empty(self.language.as_deref()).map(str::trim)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditingState {
    #[default]
    Uninitialized,
    Querying,
    Decorating,
    Decorated,
    ErrorCollected,
}

/// Result of one editing request: a decorated tree, collected errors, or
/// both when only the dictionary lookup failed.
#[derive(Debug)]
pub struct EditingResponse {
    pub handler_name: String,
    pub request: EditingRequest,
    pub state: EditingState,
    pub content: Option<LayoutResponse>,
    pub errors: Vec<LayoutError>,
}

impl EditingResponse {
    fn new(handler_name: &str, request: &EditingRequest) -> Self {
        Self {
            handler_name: handler_name.to_string(),
            request: request.clone(),
            state: EditingState::Uninitialized,
            content: None,
            errors: Vec::new(),
        }
    }

    fn fail(mut self, error: LayoutError) -> Self {
        warn!(handler = %self.handler_name, error = %error, "editing request failed");
        self.errors.push(error);
        self.state = EditingState::ErrorCollected;
        self
    }

    pub fn is_success(&self) -> bool {
        self.content.is_some() && self.errors.is_empty()
    }
}

/// Runs the editing flow against an [`EditingClient`].
pub struct EditingService<C> {
    client: C,
    config: EditingConfig,
    deserializer: LayoutDeserializer,
}

impl<C: EditingClient> EditingService<C> {
    pub fn new(client: C, config: EditingConfig) -> Self {
        Self {
            client,
            config,
            deserializer: LayoutDeserializer::default(),
        }
    }

    /// Replace the deserializer (and with it, the component id source).
    pub fn with_deserializer(mut self, deserializer: LayoutDeserializer) -> Self {
        self.deserializer = deserializer;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &EditingConfig {
        &self.config
    }

    /// Render `request` for editing.
    ///
    /// Fails only when `handler_name` is empty. Everything else ends up in
    /// the returned response.
    pub async fn handle(
        &self,
        request: &EditingRequest,
        handler_name: &str,
    ) -> Result<EditingResponse, LayoutError> {
        if handler_name.trim().is_empty() {
            return Err(LayoutError::argument("handler_name", "handler name is empty"));
        }
        let mut response = EditingResponse::new(handler_name, request);

        let Some(language) = request.resolved_language() else {
            let item = request.item().to_string();
            return Ok(response.fail(LayoutError::ItemNotFound(format!(
                "{} (no language requested)",
                item
            ))));
        };

        response.state = EditingState::Querying;
        let query = EditingQuery {
            item: request.item().to_string(),
            language: language.to_string(),
            site_name: self.site_name(request),
            version: request.version,
            dictionary_page_size: self.config.dictionary_page_size,
        };
        info!(handler = handler_name, item = %query.item, language, "querying editing service");

        let result = match self
            .bounded("editing query", self.client.editing_query(&query))
            .await
        {
            Ok(result) => result,
            Err(err) => return Ok(response.fail(err)),
        };

        let layout = match self.deserializer.deserialize(&result.layout) {
            Ok(layout) => layout,
            Err(err) => return Ok(response.fail(err)),
        };

        response.state = EditingState::Decorating;
        let feed = match result.chromes {
            Some(markers) if !markers.is_empty() => ChromeFeed::listed(markers),
            _ => ChromeFeed::everything(),
        };
        let mut content = inject_chromes(layout, &feed);

        let mut dictionary = result.dictionary.entries;
        let pending = if query.site_name.is_none() {
            // The editing query selects no dictionary without a site.
            Some(None)
        } else if result.dictionary.has_next {
            match result.dictionary.end_cursor {
                Some(cursor) => Some(Some(cursor)),
                None => {
                    response.errors.push(incomplete_dictionary(
                        "first page reports more results without a cursor",
                    ));
                    None
                }
            }
        } else {
            None
        };
        if let Some(after) = pending {
            let site_name = query
                .site_name
                .clone()
                .or_else(|| content_site_name(&content));
            match site_name {
                Some(site_name) => {
                    if let Err(err) = self
                        .fetch_pages(&site_name, language, after, &mut dictionary)
                        .await
                    {
                        warn!(error = %err, "dictionary lookup failed, keeping decorated tree");
                        response.errors.push(err);
                    }
                }
                None => debug!("no site name known, skipping dictionary lookup"),
            }
        }
        merge_dictionary(&mut content.context_raw, dictionary);

        response.content = Some(content);
        response.state = EditingState::Decorated;
        debug!(handler = handler_name, errors = response.errors.len(), "editing request decorated");
        Ok(response)
    }

    fn site_name(&self, request: &EditingRequest) -> Option<String> {
        non_empty(request.site_name.as_deref())
            .map(str::to_string)
            .or_else(|| self.config.default_site.clone())
    }

    /// Follow dictionary pages from `after` (the first page when `None`).
    async fn fetch_pages(
        &self,
        site_name: &str,
        language: &str,
        mut after: Option<String>,
        dictionary: &mut indexmap::IndexMap<String, String>,
    ) -> Result<(), LayoutError> {
        for _ in 0..MAX_DICTIONARY_PAGES {
            let query = DictionaryQuery {
                site_name: site_name.to_string(),
                language: language.to_string(),
                after: after.take(),
                page_size: self.config.dictionary_page_size,
            };
            let page = self
                .bounded("dictionary query", self.client.dictionary_page(&query))
                .await?;
            debug!(entries = page.entries.len(), has_next = page.has_next, "dictionary page");
            dictionary.extend(page.entries);
            if !page.has_next {
                return Ok(());
            }
            let Some(cursor) = page.end_cursor else {
                return Err(incomplete_dictionary(
                    "page reports more results without a cursor",
                ));
            };
            after = Some(cursor);
        }
        Err(incomplete_dictionary(format!(
            "stopped after {} pages",
            MAX_DICTIONARY_PAGES
        )))
    }

    /// Bound an upstream call by the configured timeout.
    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, LayoutError>>,
    ) -> Result<T, LayoutError> {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(elapsed) => Err(LayoutError::transport_with(
                format!("{} timed out after {:?}", what, self.config.request_timeout),
                elapsed,
            )),
        }
    }
}

fn incomplete_dictionary(reason: impl std::fmt::Display) -> LayoutError {
    LayoutError::transport(format!("dictionary incomplete: {}", reason))
}

fn content_site_name(content: &LayoutResponse) -> Option<String> {
    content
        .context()
        .and_then(|context| context.site.as_ref())
        .and_then(|site| non_empty(site.name.as_deref()))
        .map(str::to_string)
}

/// Add `entries` to the context's dictionary object, creating it if needed.
fn merge_dictionary(context: &mut Map<String, Value>, entries: indexmap::IndexMap<String, String>) {
    if entries.is_empty() {
        return;
    }
    let slot = context
        .entry(DICTIONARY_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        warn!("context dictionary is not an object, replacing it");
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(dictionary) = slot {
        for (key, value) in entries {
            dictionary.insert(key, Value::String(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrome::ChromeMarker;
    use crate::layout::{PlaceholderItem, SequentialIds};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const LAYOUT: &str = r#"{
        "sitecore": {
            "context": {"pageEditing": true, "pageState": "edit", "site": {"name": "corporate"}, "language": "en"},
            "route": {
                "name": "home",
                "placeholders": {
                    "main": [{"uid": "hero", "componentName": "Hero"}],
                    "footer": [{"uid": "links", "componentName": "Links"}]
                }
            }
        }
    }"#;

    #[derive(Default)]
    struct FakeClient {
        layout: String,
        chromes: Option<Vec<ChromeMarker>>,
        first_page: DictionaryPage,
        pages: Vec<DictionaryPage>,
        fail_query: bool,
        fail_dictionary: bool,
        endless_dictionary: bool,
        delay: Option<Duration>,
        query_calls: AtomicUsize,
        dictionary_queries: Mutex<Vec<DictionaryQuery>>,
    }

    impl FakeClient {
        fn with_layout(layout: &str) -> Self {
            Self {
                layout: layout.to_string(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl EditingClient for FakeClient {
        async fn editing_query(&self, _query: &EditingQuery) -> Result<EditingQueryResult, LayoutError> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_query {
                return Err(LayoutError::transport("HTTP 503"));
            }
            Ok(EditingQueryResult {
                layout: self.layout.clone(),
                chromes: self.chromes.clone(),
                dictionary: self.first_page.clone(),
            })
        }

        async fn dictionary_page(&self, query: &DictionaryQuery) -> Result<DictionaryPage, LayoutError> {
            let index = {
                let mut queries = self.dictionary_queries.lock().unwrap();
                queries.push(query.clone());
                queries.len() - 1
            };
            if self.fail_dictionary {
                return Err(LayoutError::transport("dictionary unavailable"));
            }
            if self.endless_dictionary {
                let key = format!("key-{}", index);
                return Ok(page(&[(key.as_str(), "v")], Some(key.as_str()), true));
            }
            Ok(self.pages.get(index).cloned().unwrap_or_default())
        }
    }

    fn service(client: FakeClient) -> EditingService<FakeClient> {
        EditingService::new(client, EditingConfig::default())
            .with_deserializer(LayoutDeserializer::new(SequentialIds::new("gen")))
    }

    fn page(entries: &[(&str, &str)], cursor: Option<&str>, has_next: bool) -> DictionaryPage {
        DictionaryPage {
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            end_cursor: cursor.map(str::to_string),
            has_next,
        }
    }

    #[tokio::test]
    async fn test_empty_handler_name_is_argument_error() {
        let service = service(FakeClient::with_layout(LAYOUT));
        let request = EditingRequest::new("/").with_language("en");
        let err = service.handle(&request, " ").await.unwrap_err();
        assert!(matches!(err, LayoutError::Argument { name: "handler_name", .. }));
        assert_eq!(service.client().query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_language_collects_item_not_found() {
        let service = service(FakeClient::with_layout(LAYOUT));
        let request = EditingRequest::new("/about");
        let response = service.handle(&request, "editing").await.unwrap();

        assert!(response.content.is_none());
        assert_eq!(response.state, EditingState::ErrorCollected);
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors.iter().all(LayoutError::is_item_not_found));
        assert_eq!(service.client().query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_decorates_everything_without_markers() {
        let service = service(FakeClient::with_layout(LAYOUT));
        let request = EditingRequest::new("/").with_language("en");
        let response = service.handle(&request, "editing").await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.state, EditingState::Decorated);
        assert_eq!(response.handler_name, "editing");
        let content = response.content.unwrap();
        let route = content.route().unwrap();
        assert_eq!(route.placeholder("main").unwrap().len(), 5);
        assert_eq!(route.placeholder("footer").unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_listed_markers_limit_decoration() {
        let client = FakeClient {
            chromes: Some(vec![ChromeMarker::placeholder("main")]),
            ..FakeClient::with_layout(LAYOUT)
        };
        let response = service(client)
            .handle(&EditingRequest::new("/").with_language("en"), "editing")
            .await
            .unwrap();
        let content = response.content.unwrap();
        let route = content.route().unwrap();
        assert_eq!(route.placeholder("main").unwrap().len(), 5);
        let footer = route.placeholder("footer").unwrap();
        assert_eq!(footer.len(), 1);
        assert!(matches!(footer.items[0], PlaceholderItem::Component(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_collected() {
        let client = FakeClient {
            fail_query: true,
            ..FakeClient::with_layout(LAYOUT)
        };
        let response = service(client)
            .handle(&EditingRequest::new("/").with_language("en"), "editing")
            .await
            .unwrap();
        assert_eq!(response.state, EditingState::ErrorCollected);
        assert!(response.content.is_none());
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].is_transport());
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let client = FakeClient {
            delay: Some(Duration::from_millis(500)),
            ..FakeClient::with_layout(LAYOUT)
        };
        let config = EditingConfig {
            request_timeout: Duration::from_millis(20),
            ..EditingConfig::default()
        };
        let service = EditingService::new(client, config);
        let response = service
            .handle(&EditingRequest::new("/").with_language("en"), "editing")
            .await
            .unwrap();
        assert!(response.errors[0].is_transport());
        assert!(response.errors[0].to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_malformed_layout_is_collected() {
        let response = service(FakeClient::with_layout("{\"sitecore\":"))
            .handle(&EditingRequest::new("/").with_language("en"), "editing")
            .await
            .unwrap();
        assert_eq!(response.state, EditingState::ErrorCollected);
        assert!(matches!(response.errors[0], LayoutError::Json(_)));
    }

    #[tokio::test]
    async fn test_dictionary_pages_are_merged() {
        let client = FakeClient {
            first_page: page(&[("greeting", "Hello")], Some("c1"), true),
            pages: vec![
                page(&[("farewell", "Bye")], Some("c2"), true),
                page(&[("thanks", "Thanks")], None, false),
            ],
            ..FakeClient::with_layout(LAYOUT)
        };
        let service = service(client);
        let mut request = EditingRequest::new("/").with_language("da");
        request.site_name = Some("corporate".into());
        let response = service.handle(&request, "editing").await.unwrap();
        assert!(response.is_success());

        let content = response.content.unwrap();
        assert_eq!(
            content.context_raw[DICTIONARY_KEY],
            serde_json::json!({"greeting": "Hello", "farewell": "Bye", "thanks": "Thanks"})
        );
        assert_eq!(content.context_raw["pageEditing"], true);

        let queries = service.client().dictionary_queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].site_name, "corporate");
        assert_eq!(queries[0].language, "da");
        assert_eq!(queries[0].after.as_deref(), Some("c1"));
        assert_eq!(queries[1].after.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_dictionary_site_falls_back_to_layout_context() {
        let client = FakeClient {
            pages: vec![page(&[("greeting", "Hej")], None, false)],
            ..FakeClient::with_layout(LAYOUT)
        };
        let service = service(client);
        let response = service
            .handle(&EditingRequest::new("/").with_language("da"), "editing")
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.content.unwrap().context_raw[DICTIONARY_KEY]["greeting"], "Hej");

        let queries = service.client().dictionary_queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].site_name, "corporate");
        assert_eq!(queries[0].after, None);
    }

    #[tokio::test]
    async fn test_no_site_skips_dictionary() {
        let layout = r#"{"sitecore": {"route": {"placeholders": {"main": [{"uid": "a"}]}}}}"#;
        let service = service(FakeClient::with_layout(layout));
        let response = service
            .handle(&EditingRequest::new("/").with_language("en"), "editing")
            .await
            .unwrap();
        assert!(response.is_success());
        assert!(service.client().dictionary_queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursorless_page_is_reported() {
        let client = FakeClient {
            first_page: page(&[("greeting", "Hello")], Some("c1"), true),
            pages: vec![page(&[("farewell", "Bye")], None, true)],
            ..FakeClient::with_layout(LAYOUT)
        };
        let mut request = EditingRequest::new("/").with_language("en");
        request.site_name = Some("corporate".into());
        let response = service(client).handle(&request, "editing").await.unwrap();

        assert_eq!(response.state, EditingState::Decorated);
        assert!(!response.is_success());
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].to_string().contains("without a cursor"));
        let content = response.content.unwrap();
        assert_eq!(
            content.context_raw[DICTIONARY_KEY],
            serde_json::json!({"greeting": "Hello", "farewell": "Bye"})
        );
    }

    #[tokio::test]
    async fn test_cursorless_first_page_is_reported() {
        let client = FakeClient {
            first_page: page(&[("greeting", "Hello")], None, true),
            ..FakeClient::with_layout(LAYOUT)
        };
        let mut request = EditingRequest::new("/").with_language("en");
        request.site_name = Some("corporate".into());
        let service = service(client);
        let response = service.handle(&request, "editing").await.unwrap();

        assert_eq!(response.state, EditingState::Decorated);
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].is_transport());
        assert!(service.client().dictionary_queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dictionary_page_limit_is_reported() {
        let client = FakeClient {
            endless_dictionary: true,
            ..FakeClient::with_layout(LAYOUT)
        };
        let service = service(client);
        let response = service
            .handle(&EditingRequest::new("/").with_language("en"), "editing")
            .await
            .unwrap();

        assert_eq!(response.state, EditingState::Decorated);
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].to_string().contains("stopped after 50 pages"));
        let content = response.content.unwrap();
        let dictionary = content.context_raw[DICTIONARY_KEY].as_object().unwrap();
        assert_eq!(dictionary.len(), MAX_DICTIONARY_PAGES);
        assert_eq!(
            service.client().dictionary_queries.lock().unwrap().len(),
            MAX_DICTIONARY_PAGES
        );
    }

    #[tokio::test]
    async fn test_dictionary_failure_keeps_tree() {
        let client = FakeClient {
            first_page: page(&[("greeting", "Hello")], Some("c1"), true),
            fail_dictionary: true,
            ..FakeClient::with_layout(LAYOUT)
        };
        let response = service(client)
            .handle(&EditingRequest::new("/").with_language("en"), "editing")
            .await
            .unwrap();
        assert_eq!(response.state, EditingState::Decorated);
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].is_transport());
        let content = response.content.unwrap();
        assert_eq!(content.context_raw[DICTIONARY_KEY]["greeting"], "Hello");
    }

    #[test]
    fn test_item_resolution_order() {
        let mut request = EditingRequest::new("/raw/path");
        assert_eq!(request.item(), "/raw/path");
        request.item_path = Some(String::new());
        assert_eq!(request.item(), "/raw/path");
        request.item_path = Some("/sitecore/content/home".into());
        assert_eq!(request.item(), "/sitecore/content/home");
        request.item_id = Some("{ITEM}".into());
        assert_eq!(request.item(), "{ITEM}");
    }

    #[test]
    fn test_blank_language_is_unresolved() {
        let request = EditingRequest::new("/").with_language("  ");
        assert_eq!(request.resolved_language(), None);
    }
}
