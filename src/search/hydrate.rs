use crate::storage::{DocumentStore, Query, StoreError};
use crate::types::{SiteDetail, TOUR_COLLECTION};

/// Load full records for matched ids, preserving their order.
///
/// Each id is looked up by its `contentid` field first, then as a document
/// id. Ids that resolve to nothing, and ids whose lookup fails, are logged
/// and skipped.
pub async fn hydrate(store: &dyn DocumentStore, ids: &[String]) -> Vec<SiteDetail> {
    let mut details = Vec::with_capacity(ids.len());
    for id in ids {
        if id.is_empty() {
            continue;
        }
        match lookup(store, id).await {
            Ok(Some(detail)) => details.push(detail),
            Ok(None) => tracing::warn!("Site {} not found, skipping", id),
            Err(e) => tracing::warn!("Failed to load site {}: {}", id, e),
        }
    }
    details
}

async fn lookup(store: &dyn DocumentStore, id: &str) -> Result<Option<SiteDetail>, StoreError> {
    let by_content_id = store
        .query(TOUR_COLLECTION, &Query::eq("contentid", id).limit(1))
        .await?;
    if let Some(doc) = by_content_id.first() {
        return Ok(Some(SiteDetail::from_fields(&doc.fields)));
    }

    Ok(store
        .get(TOUR_COLLECTION, id)
        .await?
        .map(|doc| SiteDetail::from_fields(&doc.fields)))
}
