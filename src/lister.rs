use anyhow::Result;
use colored::*;
use tracing::{debug, error};

use crate::api::{ApiClient, PageCursor};

const INITIAL_PAGE_SIZE: u64 = 20;

/// Walks the paginated project listing and prints every page's objects as
/// pretty-printed JSON.
pub struct ProjectLister {
    api: ApiClient,
}

impl ProjectLister {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch pages until the service stops handing out a `meta.next` link.
    ///
    /// A failed request, an undecodable page, or a malformed next link is
    /// logged and halts the walk; nothing is retried, and the run still
    /// finishes normally.
    pub async fn run(&self) -> Result<()> {
        debug!("Connecting to the API at {}", self.api.base_url().green());

        let mut cursor = PageCursor::new(0, INITIAL_PAGE_SIZE);

        loop {
            debug!("Querying at offset {} limit {}", cursor.offset, cursor.limit);

            let page = match self.api.list_projects(cursor).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Listing aborted: {:#}", e);
                    break;
                }
            };

            if let Some(objects) = &page.objects {
                println!("{}", serde_json::to_string_pretty(objects)?);
            }

            let Some(next) = page.next_link() else {
                debug!("No further page link, done");
                break;
            };

            debug!("Next page link: {}", next.green());
            cursor = match cursor.advanced(next) {
                Ok(advanced) => advanced,
                Err(e) => {
                    error!("Listing aborted: {:#}", e);
                    break;
                }
            };
        }

        Ok(())
    }
}
