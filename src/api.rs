use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Base URL of the ReadTheDocs.org v1 API.
pub const DEFAULT_BASE_URL: &str = "https://readthedocs.org/api/v1";

/// Offset/limit pair driving the paginated project listing.
///
/// The API hands back the next window as a relative URL in `meta.next`;
/// [`PageCursor::advanced`] derives the follow-up cursor from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: u64,
    pub limit: u64,
}

impl PageCursor {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Derive the next cursor from a `meta.next` link such as
    /// `/api/v1/project/?limit=20&offset=20`.
    ///
    /// Only `limit` and `offset` parameters are honored; unknown parameters
    /// are skipped. A `limit` or `offset` value that does not parse as an
    /// integer is an error, so a malformed link stops the pagination walk
    /// instead of re-requesting the same window forever.
    pub fn advanced(&self, next_url: &str) -> Result<Self> {
        let query = next_url.splitn(2, '?').last().unwrap_or("");
        let mut next = *self;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "limit" => {
                    next.limit = value.parse().map_err(|_| {
                        anyhow!("Bad limit \"{}\" in page link {}", value, next_url)
                    })?;
                }
                "offset" => {
                    next.offset = value.parse().map_err(|_| {
                        anyhow!("Bad offset \"{}\" in page link {}", value, next_url)
                    })?;
                }
                _ => {}
            }
        }
        Ok(next)
    }
}

/// One page of the project listing. The objects are kept as raw JSON since
/// the lister prints them verbatim.
#[derive(Debug, Deserialize)]
pub struct ProjectPage {
    pub objects: Option<Vec<serde_json::Value>>,
    pub meta: Option<PageMeta>,
}

impl ProjectPage {
    /// Relative URL of the next page, if the service reported one.
    pub fn next_link(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|meta| meta.next.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct PageMeta {
    pub next: Option<String>,
}

/// Result of a single-project lookup. The API returns at most one object per
/// slug, but nothing here relies on that.
#[derive(Debug, Deserialize)]
pub struct ProjectLookup {
    pub objects: Option<Vec<Project>>,
}

/// The slice of a ReadTheDocs project record this tool cares about. Every
/// field is optional; a missing field simply means there is nothing to print
/// or download for it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    pub slug: Option<String>,
    pub project_url: Option<String>,
    pub repo: Option<String>,
    pub modified_date: Option<String>,
    pub enable_epub_build: Option<bool>,
    pub enable_pdf_build: Option<bool>,
    /// Format name (`epub`, `htmlzip`, `pdf`) to download URL.
    #[serde(default)]
    pub downloads: BTreeMap<String, String>,
}

/// Thin typed wrapper over the two v1 endpoints this tool consumes.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root, e.g. a mock server in tests.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client, shared with the artifact probes/downloads.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// `GET {base}/project/?offset=&limit=`, one page of the full listing.
    pub async fn list_projects(&self, cursor: PageCursor) -> Result<ProjectPage> {
        let url = format!("{}/project/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("offset", cursor.offset), ("limit", cursor.limit)])
            .send()
            .await
            .map_err(|e| anyhow!("Project listing request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Project listing returned HTTP {}", status));
        }

        response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to decode project listing: {}", e))
    }

    /// `GET {base}/project/?slug=`, a single-project lookup by slug.
    pub async fn get_project(&self, slug: &str) -> Result<ProjectLookup> {
        let url = format!("{}/project/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("slug", slug)])
            .send()
            .await
            .map_err(|e| anyhow!("Lookup of project \"{}\" failed: {}", slug, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Lookup of project \"{}\" returned HTTP {}",
                slug,
                status
            ));
        }

        response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to decode project \"{}\": {}", slug, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advances_from_next_link() {
        let cursor = PageCursor::new(0, 20);
        let next = cursor.advanced("/api/v1/project/?limit=20&offset=20").unwrap();
        assert_eq!(next, PageCursor::new(20, 20));
    }

    #[test]
    fn cursor_honors_changed_limit() {
        let cursor = PageCursor::new(20, 20);
        let next = cursor.advanced("/api/v1/project/?limit=10&offset=40").unwrap();
        assert_eq!(next, PageCursor::new(40, 10));
    }

    #[test]
    fn cursor_keeps_fields_missing_from_link() {
        let cursor = PageCursor::new(40, 10);
        let next = cursor.advanced("/api/v1/project/?offset=50").unwrap();
        assert_eq!(next, PageCursor::new(50, 10));
    }

    #[test]
    fn cursor_ignores_unknown_params() {
        let cursor = PageCursor::new(0, 20);
        let next = cursor
            .advanced("/api/v1/project/?format=json&offset=20&limit=30")
            .unwrap();
        assert_eq!(next, PageCursor::new(20, 30));
    }

    #[test]
    fn cursor_rejects_unparsable_window_values() {
        let cursor = PageCursor::new(0, 20);
        assert!(cursor.advanced("/api/v1/project/?offset=abc&limit=20").is_err());
        assert!(cursor.advanced("/api/v1/project/?offset=20&limit=-1").is_err());
    }

    #[test]
    fn cursor_unchanged_by_link_without_query() {
        let cursor = PageCursor::new(60, 30);
        assert_eq!(cursor.advanced("/api/v1/project/").unwrap(), cursor);
    }

    #[test]
    fn page_without_meta_has_no_next_link() {
        let page: ProjectPage = serde_json::from_str(r#"{"objects": []}"#).unwrap();
        assert!(page.next_link().is_none());
        assert_eq!(page.objects.as_deref(), Some(&[][..]));
    }

    #[test]
    fn page_with_null_next_has_no_next_link() {
        let page: ProjectPage =
            serde_json::from_str(r#"{"objects": [], "meta": {"next": null}}"#).unwrap();
        assert!(page.next_link().is_none());
    }

    #[test]
    fn page_without_objects_deserializes() {
        let page: ProjectPage =
            serde_json::from_str(r#"{"meta": {"next": "/api/v1/project/?offset=20&limit=20"}}"#)
                .unwrap();
        assert!(page.objects.is_none());
        assert_eq!(page.next_link(), Some("/api/v1/project/?offset=20&limit=20"));
    }

    #[test]
    fn project_without_downloads_deserializes_empty() {
        let project: Project = serde_json::from_str(r#"{"slug": "demo"}"#).unwrap();
        assert!(project.downloads.is_empty());
        assert!(project.enable_pdf_build.is_none());
    }

    #[test]
    fn project_downloads_deserialize() {
        let project: Project = serde_json::from_str(
            r#"{"downloads": {"pdf": "//host/doc.pdf", "htmlzip": "//host/doc.zip"}}"#,
        )
        .unwrap();
        assert_eq!(project.downloads.len(), 2);
        assert_eq!(project.downloads["pdf"], "//host/doc.pdf");
    }
}
