//! Traversal engine
//!
//! One call = one fresh traversal of a node's children. Pages are merged in
//! arrival order; the first failed page aborts the whole traversal and the
//! pages collected so far are dropped. Nothing is cached between calls.
//! A traversal that fails or times out releases its open continuation token.

use parking_lot::Mutex;
use std::time::Duration;

use nodecfg_nodes::{BrowseRequest, ContinuationToken, NodeId, NodeRef, StatusCode};

use crate::client::RemoteNamespaceClient;
use crate::error::BrowseError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseOptions {
    /// Budget for the whole traversal, all pages included
    pub timeout: Duration,
    /// Upper bound on pages for a single traversal
    pub max_pages: usize,
}

impl BrowseOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_pages: 10_000,
        }
    }
}

/// Browse the children of `node_id`, following continuation tokens
///
/// An empty `node_id` browses the root objects folder.
pub async fn browse_children(
    client: &dyn RemoteNamespaceClient,
    node_id: &str,
    options: BrowseOptions,
) -> Result<Vec<NodeRef>> {
    if !client.is_connected() {
        return Err(BrowseError::NotConnected);
    }

    let start = NodeId::parse_or_root(node_id)?;
    let request = BrowseRequest::children_of(start);

    let pending = Mutex::new(None);
    let outcome = tokio::time::timeout(
        options.timeout,
        collect_pages(client, &request, options.max_pages, &pending),
    )
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                node_id = %request.node_id,
                timeout = ?options.timeout,
                "Browse timed out"
            );
            Err(BrowseError::Timeout(options.timeout))
        }
    };

    if result.is_err() {
        let token = pending.lock().take();
        if let Some(token) = token {
            release(client, &token).await;
        }
    }

    result
}

async fn release(client: &dyn RemoteNamespaceClient, token: &ContinuationToken) {
    if let Err(e) = client.release_continuation(token).await {
        tracing::debug!(error = %e, "Failed to release continuation token");
    }
}

async fn collect_pages(
    client: &dyn RemoteNamespaceClient,
    request: &BrowseRequest,
    max_pages: usize,
    pending: &Mutex<Option<ContinuationToken>>,
) -> Result<Vec<NodeRef>> {
    let mut references = Vec::new();
    let mut continuation: Option<ContinuationToken> = None;
    let mut pages = 0usize;

    loop {
        let page = client.browse_page(request, continuation.as_ref()).await?;
        pages += 1;

        if !page.status.is_good() {
            tracing::warn!(
                node_id = %request.node_id,
                page = pages,
                status = %page.status,
                "Browse page failed"
            );
            return Err(BrowseError::remote(
                page.status,
                format!("browse of {} failed on page {}", request.node_id, pages),
            ));
        }

        let has_more = page.has_more();
        references.extend(page.references);

        let token = match page.continuation {
            Some(token) if has_more => token,
            _ => break,
        };
        *pending.lock() = Some(token.clone());

        if pages >= max_pages {
            return Err(BrowseError::remote(
                StatusCode::BAD_UNEXPECTED,
                format!(
                    "browse of {} still had more results after {} pages",
                    request.node_id, max_pages
                ),
            ));
        }

        continuation = Some(token);
    }

    *pending.lock() = None;

    tracing::debug!(
        node_id = %request.node_id,
        pages,
        references = references.len(),
        "Browse completed"
    );

    Ok(references)
}
