//! Information gathering: execute a retrieval plan against the registry.

use std::sync::Arc;

use delver_config::SearchStrategy;
use delver_core::evidence::{EvidenceRecord, EvidenceSource};
use delver_core::plan::RetrievalPlan;
use delver_tools::ToolRegistry;
use tracing::{debug, info};

/// Registry names the pipeline looks up.
pub const WEB_TOOL: &str = "web_search";
pub const ENCYCLOPEDIA_TOOL: &str = "wikipedia";
pub const EXTRACTOR_TOOL: &str = "content_extractor";

/// Per-source result caps.
pub const ENCYCLOPEDIA_RESULT_CAP: usize = 2;
pub const WEB_RESULT_CAP: usize = 3;

pub struct InformationGatherer {
    registry: Arc<ToolRegistry>,
    strategy: SearchStrategy,
}

impl InformationGatherer {
    pub fn new(registry: Arc<ToolRegistry>, strategy: SearchStrategy) -> Self {
        Self { registry, strategy }
    }

    pub fn set_strategy(&mut self, strategy: SearchStrategy) {
        self.strategy = strategy;
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Encyclopedia records first, then web records. Only the plan's first
    /// search term is used.
    pub async fn gather(&self, plan: &RetrievalPlan) -> Vec<EvidenceRecord> {
        let Some(term) = plan.primary_term() else {
            debug!("No search term, skipping retrieval");
            return Vec::new();
        };

        let tools = self.registry.snapshot();
        let mut evidence = Vec::new();

        if plan.needs_encyclopedia() {
            if let Some(encyclopedia) = tools.search(ENCYCLOPEDIA_TOOL) {
                info!(term, "Searching Wikipedia");
                let hits = encyclopedia.search(term, ENCYCLOPEDIA_RESULT_CAP).await;
                evidence.extend(
                    hits.into_iter()
                        .take(ENCYCLOPEDIA_RESULT_CAP)
                        .map(|hit| EvidenceRecord::from_hit(EvidenceSource::Encyclopedia, hit)),
                );
            } else {
                debug!(tool = ENCYCLOPEDIA_TOOL, "Tool not enabled");
            }
        }

        if plan.needs_web() {
            if let Some(web) = tools.search(WEB_TOOL) {
                info!(term, "Searching the web");
                let mut records: Vec<EvidenceRecord> = web
                    .search(term, WEB_RESULT_CAP)
                    .await
                    .into_iter()
                    .take(WEB_RESULT_CAP)
                    .map(|hit| EvidenceRecord::from_hit(EvidenceSource::Web, hit))
                    .collect();

                if let Some(extractor) = tools.extractor(EXTRACTOR_TOOL) {
                    for record in records.iter_mut().take(self.strategy.content_extraction_limit) {
                        if let Some(url) = &record.url {
                            let content = extractor
                                .extract(url, self.strategy.extraction_max_length)
                                .await;
                            record.full_content = Some(content);
                        }
                    }
                }
                evidence.extend(records);
            } else {
                debug!(tool = WEB_TOOL, "Tool not enabled");
            }
        }

        info!(count = evidence.len(), "Gathered information sources");
        evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingExtractor, RecordingSearch, hit, mock_registry};
    use delver_core::evidence::SearchHit;

    fn plan(web: bool, wiki: bool, terms: &[&str]) -> RetrievalPlan {
        RetrievalPlan::new(web, wiki, terms.iter().map(|t| t.to_string()).collect(), "x").unwrap()
    }

    #[tokio::test]
    async fn caps_results_and_orders_encyclopedia_first() {
        let web = RecordingSearch::returning((1..=5).map(hit).collect());
        let wiki = RecordingSearch::returning((10..=13).map(hit).collect());
        let extractor = RecordingExtractor::new();
        let gatherer = InformationGatherer::new(
            mock_registry(Some(web.clone()), Some(wiki.clone()), Some(extractor.clone())),
            SearchStrategy::default(),
        );

        let evidence = gatherer.gather(&plan(true, true, &["paris", "france"])).await;

        assert_eq!(evidence.len(), 5);
        assert!(evidence[..2].iter().all(|r| r.source == EvidenceSource::Encyclopedia));
        assert!(evidence[2..].iter().all(|r| r.source == EvidenceSource::Web));
        assert_eq!(wiki.calls(), vec![("paris".to_string(), 2)]);
        assert_eq!(web.calls(), vec![("paris".to_string(), 3)]);

        // Default extraction limit is 2, only web results are extracted.
        assert_eq!(extractor.calls().len(), 2);
        assert_eq!(extractor.calls()[0], ("https://example.com/1".to_string(), 2000));
        assert_eq!(evidence[2].full_content.as_deref(), Some("content of https://example.com/1"));
        assert!(evidence[4].full_content.is_none());
        assert!(evidence[0].full_content.is_none());
    }

    #[tokio::test]
    async fn extraction_limit_is_configurable() {
        let web = RecordingSearch::returning((1..=3).map(hit).collect());
        let extractor = RecordingExtractor::new();
        let strategy = SearchStrategy {
            content_extraction_limit: 0,
            extraction_max_length: 500,
        };
        let mut gatherer = InformationGatherer::new(
            mock_registry(Some(web), None, Some(extractor.clone())),
            strategy,
        );

        gatherer.gather(&plan(true, false, &["x"])).await;
        assert!(extractor.calls().is_empty());

        gatherer.set_strategy(SearchStrategy {
            content_extraction_limit: 3,
            extraction_max_length: 500,
        });
        gatherer.gather(&plan(true, false, &["x"])).await;
        assert_eq!(extractor.calls().len(), 3);
        assert!(extractor.calls().iter().all(|(_, len)| *len == 500));
    }

    #[tokio::test]
    async fn results_without_url_are_not_extracted() {
        let web = RecordingSearch::returning(vec![
            SearchHit::new("No link", "snippet", ""),
            hit(2),
        ]);
        let extractor = RecordingExtractor::new();
        let gatherer = InformationGatherer::new(
            mock_registry(Some(web), None, Some(extractor.clone())),
            SearchStrategy::default(),
        );

        let evidence = gatherer.gather(&plan(true, false, &["x"])).await;
        assert_eq!(evidence.len(), 2);
        assert!(evidence[0].full_content.is_none());
        assert_eq!(extractor.calls(), vec![("https://example.com/2".to_string(), 2000)]);
    }

    #[tokio::test]
    async fn disabled_tools_are_skipped() {
        let wiki = RecordingSearch::returning(vec![hit(1)]);
        let gatherer = InformationGatherer::new(
            mock_registry(None, Some(wiki.clone()), None),
            SearchStrategy::default(),
        );

        let evidence = gatherer.gather(&plan(true, false, &["x"])).await;
        assert!(evidence.is_empty());
        assert!(wiki.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_term_makes_no_calls() {
        let web = RecordingSearch::returning(vec![hit(1)]);
        let gatherer = InformationGatherer::new(
            mock_registry(Some(web.clone()), None, None),
            SearchStrategy::default(),
        );

        let evidence = gatherer.gather(&RetrievalPlan::fallback("  ")).await;
        assert!(evidence.is_empty());
        assert!(web.calls().is_empty());
    }
}
