use std::sync::Arc;

use anyhow::{Context, Result};

use super::analyzer::QueryAnalyzer;
use super::hydrate::hydrate;
use super::matcher::match_spots;
use crate::storage::DocumentStore;
use crate::types::{Recommendation, SiteSummary, TOUR_COLLECTION};

/// Query pipeline: analyze, match against every site, hydrate the matches
pub struct Recommender {
    store: Arc<dyn DocumentStore>,
    analyzer: QueryAnalyzer,
    max_results: usize,
}

impl Recommender {
    pub fn new(store: Arc<dyn DocumentStore>, analyzer: QueryAnalyzer, max_results: usize) -> Self {
        Self {
            store,
            analyzer,
            max_results,
        }
    }

    /// Answer a trimmed, non-empty query
    pub async fn recommend(&self, query: &str) -> Result<Recommendation> {
        let spots = self.summaries().await?;
        let outcome = self.analyzer.analyze(query).await;

        let ids = match_spots(&outcome.analysis.keywords, &spots, self.max_results);
        let details = hydrate(self.store.as_ref(), &ids).await;

        tracing::info!(
            "Query {:?}: {} sites, {} matched, {} returned (ai_used={})",
            query,
            spots.len(),
            ids.len(),
            details.len(),
            outcome.ai_used
        );

        Ok(Recommendation {
            success: true,
            query: query.to_string(),
            analysis: outcome.analysis,
            ai_used: outcome.ai_used,
            total_found: ids.len(),
            returned_count: details.len(),
            recommended_spots: details,
        })
    }

    async fn summaries(&self) -> Result<Vec<SiteSummary>> {
        let docs = self
            .store
            .list(TOUR_COLLECTION)
            .await
            .context("Failed to list tourism sites")?;
        Ok(docs
            .iter()
            .map(|doc| SiteSummary::from_fields(&doc.id, &doc.fields))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedGenerator;
    use crate::storage::MemoryStore;
    use serde_json::json;

    async fn store_with_sites(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let named = [
            ("126", "빙계계곡", "얼음 계곡"),
            ("127", "의성마늘 체험장", "마늘 수확 체험"),
            ("128", "조문국박물관", "조문국 유물 전시"),
        ];
        for (id, title, overview) in named {
            let fields = json!({"contentid": id, "title": title, "overview": overview});
            store
                .set(TOUR_COLLECTION, id, fields.as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        for i in 0..count {
            let id = format!("9{i:03}");
            let fields = json!({"contentid": id, "title": format!("장소 {i}"), "overview": "설명"});
            store
                .set(TOUR_COLLECTION, &id, fields.as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_recommend_with_model() {
        let store = store_with_sites(0).await;
        let generator = ScriptedGenerator::replying(r#"{"keywords": ["마늘"], "intent": "experience"}"#);
        let recommender = Recommender::new(
            store,
            QueryAnalyzer::new(Some(Arc::new(generator))),
            30,
        );

        let rec = recommender.recommend("특산품 체험").await.unwrap();
        assert!(rec.success);
        assert!(rec.ai_used);
        assert_eq!(rec.total_found, 1);
        assert_eq!(rec.returned_count, 1);
        assert_eq!(rec.recommended_spots[0].title, "의성마늘 체험장");
        assert_eq!(rec.analysis.intent, "experience");
    }

    #[tokio::test]
    async fn test_recommend_degraded_still_matches() {
        let store = store_with_sites(0).await;
        let recommender = Recommender::new(
            store,
            QueryAnalyzer::new(Some(Arc::new(ScriptedGenerator::failing("SAFETY")))),
            30,
        );

        let rec = recommender.recommend("조문국 유적").await.unwrap();
        assert!(!rec.ai_used);
        assert_eq!(rec.analysis.keywords, vec!["조문국"]);
        assert_eq!(rec.recommended_spots[0].contentid, "128");
    }

    #[tokio::test]
    async fn test_recommend_no_match_caps_to_max_results() {
        let store = store_with_sites(40).await;
        let generator = ScriptedGenerator::replying(r#"{"keywords": ["없음"]}"#);
        let recommender = Recommender::new(store, QueryAnalyzer::new(Some(Arc::new(generator))), 30);

        let rec = recommender.recommend("아무거나").await.unwrap();
        assert_eq!(rec.total_found, 30);
        assert_eq!(rec.returned_count, 30);
        assert_eq!(rec.recommended_spots[0].contentid, "126");
    }

    #[tokio::test]
    async fn test_recommend_empty_collection() {
        let recommender = Recommender::new(Arc::new(MemoryStore::new()), QueryAnalyzer::new(None), 30);
        let rec = recommender.recommend("마늘").await.unwrap();
        assert!(rec.recommended_spots.is_empty());
        assert_eq!(rec.total_found, 0);
    }
}
