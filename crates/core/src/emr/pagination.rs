//! Exhaustive, rate-limited pagination over one EMR collection.

use std::sync::Arc;
use std::time::Duration;

use carebridge_domain::{PageFailure, RecordPage, TRANSPORT_FAILURE_STATUS};
use serde_json::Value;
use tracing::{debug, warn};

use super::client::EmrClient;

/// Everything harvested from one collection walk.
///
/// Partial results are kept: a failure on page N still returns the records
/// from pages 1..N alongside the failure description.
#[derive(Debug)]
pub struct PageHarvest {
    pub records: Vec<Value>,
    pub pages_fetched: u32,
    pub failure: Option<PageFailure>,
}

/// Walks a paginated EMR collection to exhaustion.
///
/// Follows `next` cursors verbatim, pauses between page fetches to stay
/// under provider rate limits, and stops at a hard page ceiling so a
/// provider bug returning a cyclic cursor cannot loop forever.
pub struct PaginationEngine {
    client: Arc<EmrClient>,
    page_delay: Duration,
    max_pages: u32,
}

impl PaginationEngine {
    pub fn new(client: Arc<EmrClient>, page_delay: Duration, max_pages: u32) -> Self {
        Self { client, page_delay, max_pages }
    }

    /// Fetch every page of the collection at `start_endpoint` for
    /// `principal_id`. Never returns `Err`: all failure modes are folded
    /// into the harvest so the caller keeps what was already fetched.
    pub async fn fetch_all(&self, start_endpoint: &str, principal_id: &str) -> PageHarvest {
        let mut records = Vec::new();
        let mut pages_fetched = 0u32;
        let mut endpoint = start_endpoint.to_string();

        loop {
            if pages_fetched >= self.max_pages {
                warn!(
                    endpoint = start_endpoint,
                    max_pages = self.max_pages,
                    "page ceiling reached before cursor exhaustion"
                );
                break;
            }

            let page_number = pages_fetched + 1;
            let response = match self.client.get(&endpoint, principal_id).await {
                Ok(response) => response,
                Err(err) => {
                    // Credential resolution failed before the wire. Auth
                    // problems carry the provider-rejection status so the
                    // report can suggest reauthorization.
                    let status = if err.requires_reauthorization() {
                        401
                    } else {
                        TRANSPORT_FAILURE_STATUS
                    };
                    return PageHarvest {
                        records,
                        pages_fetched,
                        failure: Some(PageFailure {
                            page: page_number,
                            status,
                            detail: err.to_string(),
                        }),
                    };
                }
            };

            if !response.ok {
                return PageHarvest {
                    records,
                    pages_fetched,
                    failure: Some(PageFailure {
                        page: page_number,
                        status: response.status,
                        detail: response.data.to_string(),
                    }),
                };
            }

            let page = match RecordPage::decode(&response.data) {
                Ok(page) => page,
                Err(err) => {
                    return PageHarvest {
                        records,
                        pages_fetched,
                        failure: Some(PageFailure {
                            page: page_number,
                            status: response.status,
                            detail: err.to_string(),
                        }),
                    };
                }
            };

            pages_fetched = page_number;
            records.extend(page.records);

            match page.next {
                // Cursor followed verbatim; providers hand back absolute URLs.
                Some(next) => endpoint = next,
                None => break,
            }

            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        debug!(
            endpoint = start_endpoint,
            pages = pages_fetched,
            records = records.len(),
            "collection walk complete"
        );
        PageHarvest { records, pages_fetched, failure: None }
    }
}
