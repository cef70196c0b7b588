//! Wine searcher: nearest-neighbour catalog retrieval under hard filters.

use crate::error::PipCoreError;
use crate::explain::explain;
use crate::phrasing::dollars;
use log::{debug, info};
use pip_rs_knowledge::{CatalogFilter, CatalogIndex, Embedder, ScoredWine};
use pip_rs_protocol::{PriceRange, SearchQuery, WineRecommendation};
use std::cmp::Ordering;
use std::sync::Arc;

/// A filter dropped to widen an empty search, with the value it held.
#[derive(Debug, Clone, PartialEq)]
pub enum Relaxation {
    Varietal(String),
    Region(String),
    Country(String),
    PriceFloor(f64),
    PriceCeiling(f64),
}

impl Relaxation {
    /// Phrase naming the dropped constraint, e.g. "the $40 price ceiling".
    pub fn describe(&self) -> String {
        match self {
            Relaxation::Varietal(varietal) => format!("the {varietal} requirement"),
            Relaxation::Region(region) => format!("the {region} region"),
            Relaxation::Country(country) => format!("the {country} requirement"),
            Relaxation::PriceFloor(min) => format!("the {} minimum", dollars(*min)),
            Relaxation::PriceCeiling(max) => format!("the {} price ceiling", dollars(*max)),
        }
    }
}

/// Drop the most specific filter still set.
///
/// Order: varietal, region, country, price floor, price ceiling. The wine
/// type is never relaxed.
pub fn relax(query: &SearchQuery) -> Option<(SearchQuery, Relaxation)> {
    let mut relaxed = query.clone();
    let dropped = if let Some(varietal) = relaxed.varietal_filter.take() {
        Relaxation::Varietal(varietal)
    } else if let Some(region) = relaxed.region_filter.take() {
        Relaxation::Region(region)
    } else if let Some(country) = relaxed.country_filter.take() {
        Relaxation::Country(country)
    } else if let Some(min) = relaxed.price_range.min.take() {
        Relaxation::PriceFloor(min)
    } else if let Some(max) = relaxed.price_range.max.take() {
        Relaxation::PriceCeiling(max)
    } else {
        return None;
    };
    Some((relaxed, dropped))
}

/// Result of a search that may have been widened once.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub recommendations: Vec<WineRecommendation>,
    pub relaxed: Option<Relaxation>,
}

/// Agent 2 of the recommendation pipeline.
pub struct WineSearcher {
    embedder: Arc<dyn Embedder>,
    catalog: Arc<dyn CatalogIndex>,
    candidate_pool: usize,
}

impl WineSearcher {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        catalog: Arc<dyn CatalogIndex>,
        candidate_pool: usize,
    ) -> Self {
        Self {
            embedder,
            catalog,
            candidate_pool,
        }
    }

    /// Up to `top_n` recommendations for `query`; empty is not an error.
    pub async fn search(
        &self,
        query: &SearchQuery,
        top_n: usize,
    ) -> Result<Vec<WineRecommendation>, PipCoreError> {
        let text = if query.query_text.trim().is_empty() {
            &query.user_request
        } else {
            &query.query_text
        };
        let embedding = self.embedder.embed(text).await?;
        let filter = CatalogFilter::from_query(query);
        let mut candidates = self
            .catalog
            .search(&embedding, &filter, self.candidate_pool.max(top_n))
            .await?;
        let returned = candidates.len();
        candidates.retain(|candidate| filter.matches(&candidate.wine));
        rank_candidates(&mut candidates, &query.price_range);
        candidates.truncate(top_n);
        debug!(
            "wine search (returned={}, kept={}, top_n={})",
            returned,
            candidates.len(),
            top_n
        );
        Ok(candidates
            .into_iter()
            .map(|candidate| {
                let explanation = explain(query, &candidate.wine);
                WineRecommendation {
                    wine: candidate.wine,
                    explanation: explanation.text,
                    relevance_score: candidate.score.clamp(0.0, 1.0),
                    provenance: explanation.provenance,
                }
            })
            .collect())
    }

    /// Search, then retry once with one filter dropped when nothing matched.
    pub async fn search_with_relaxation(
        &self,
        query: &SearchQuery,
        top_n: usize,
        allow_relaxation: bool,
    ) -> Result<SearchOutcome, PipCoreError> {
        let recommendations = self.search(query, top_n).await?;
        if !recommendations.is_empty() || !allow_relaxation {
            return Ok(SearchOutcome {
                recommendations,
                relaxed: None,
            });
        }
        let Some((relaxed_query, relaxation)) = relax(query) else {
            return Ok(SearchOutcome {
                recommendations,
                relaxed: None,
            });
        };
        info!("relaxing empty search (dropped={:?})", relaxation);
        let recommendations = self.search(&relaxed_query, top_n).await?;
        Ok(SearchOutcome {
            relaxed: (!recommendations.is_empty()).then_some(relaxation),
            recommendations,
        })
    }
}

/// Order by similarity, then rating (unrated last), then closeness to the
/// middle of the requested price range, then id.
pub fn rank_candidates(candidates: &mut [ScoredWine], price: &PriceRange) {
    let midpoint = price.midpoint();
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| match (a.wine.rating, b.wine.rating) {
                (Some(a), Some(b)) => b.total_cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| match midpoint {
                Some(mid) => (a.wine.price_usd - mid)
                    .abs()
                    .total_cmp(&(b.wine.price_usd - mid).abs()),
                None => Ordering::Equal,
            })
            .then_with(|| a.wine.id.cmp(&b.wine.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_protocol::WineType;
    use pip_rs_test_utils::{
        FailingCatalog, FailingEmbedder, KeywordEmbedder, sample_catalog, sample_wine,
    };
    use pretty_assertions::assert_eq;

    async fn searcher() -> WineSearcher {
        WineSearcher::new(
            Arc::new(KeywordEmbedder::new()),
            Arc::new(sample_catalog().await),
            20,
        )
    }

    fn query(text: &str) -> SearchQuery {
        SearchQuery {
            query_text: text.to_string(),
            user_request: text.to_string(),
            ..SearchQuery::default()
        }
    }

    #[tokio::test]
    async fn hard_filters_bound_every_result() {
        let query = SearchQuery {
            price_range: PriceRange::new(None, Some(40.0)),
            wine_type_filter: Some(WineType::Red),
            food_pairing: Some("steak".to_string()),
            ..query("Red wine under $40 for steak")
        };
        let results = searcher().await.search(&query, 3).await.expect("search");
        assert!(!results.is_empty());
        assert!(results.len() <= 3);
        for result in &results {
            assert_eq!(result.wine.wine_type, WineType::Red);
            assert!(result.wine.price_usd <= 40.0);
            assert!(!result.explanation.is_empty());
        }
    }

    #[tokio::test]
    async fn similarity_never_beats_a_hard_filter() {
        let query = SearchQuery {
            price_range: PriceRange::new(None, Some(40.0)),
            ..query("Cascina Nebbia Barolo Nebbiolo Piedmont")
        };
        let results = searcher().await.search(&query, 10).await.expect("search");
        assert!(results.iter().all(|result| result.wine.id != "barolo"));
    }

    #[tokio::test]
    async fn country_filter_matches_region_text() {
        let query = SearchQuery {
            country_filter: Some("California".to_string()),
            wine_type_filter: Some(WineType::Red),
            ..query("California red")
        };
        let results = searcher().await.search(&query, 5).await.expect("search");
        let mut ids = results
            .iter()
            .map(|result| result.wine.id.as_str())
            .collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec!["napa-cab", "paso-zin"]);
    }

    #[tokio::test]
    async fn empty_search_relaxes_the_most_specific_filter() {
        let query = SearchQuery {
            varietal_filter: Some("Nebbiolo".to_string()),
            price_range: PriceRange::new(None, Some(30.0)),
            wine_type_filter: Some(WineType::Red),
            ..query("nebbiolo under $30")
        };
        let outcome = searcher()
            .await
            .search_with_relaxation(&query, 3, true)
            .await
            .expect("search");
        assert_eq!(
            outcome.relaxed,
            Some(Relaxation::Varietal("Nebbiolo".to_string()))
        );
        assert!(!outcome.recommendations.is_empty());
        assert!(
            outcome
                .recommendations
                .iter()
                .all(|rec| rec.wine.price_usd <= 30.0)
        );

        let strict = searcher()
            .await
            .search_with_relaxation(&query, 3, false)
            .await
            .expect("search");
        assert!(strict.recommendations.is_empty());
        assert_eq!(strict.relaxed, None);
    }

    #[test]
    fn relax_walks_filters_in_order() {
        let mut query = SearchQuery {
            region_filter: Some("Rioja".to_string()),
            price_range: PriceRange::new(Some(20.0), Some(40.0)),
            ..SearchQuery::default()
        };
        let mut dropped = Vec::new();
        while let Some((next, relaxation)) = relax(&query) {
            dropped.push(relaxation.describe());
            query = next;
        }
        assert_eq!(
            dropped,
            vec!["the Rioja region", "the $20 minimum", "the $40 price ceiling"]
        );
    }

    #[test]
    fn ties_break_by_rating_then_price_then_id() {
        let mut unrated = sample_wine("mendoza-malbec");
        unrated.rating = None;
        let mut cheap = sample_wine("paso-zin");
        cheap.rating = Some(4.0);
        cheap.price_usd = 30.0;
        let mut near = sample_wine("rioja-reserva");
        near.rating = Some(4.0);
        near.price_usd = 20.0;
        let best = sample_wine("barolo");
        let mut candidates = [unrated, cheap, near, best]
            .into_iter()
            .map(|wine| ScoredWine { wine, score: 0.5 })
            .collect::<Vec<_>>();
        rank_candidates(&mut candidates, &PriceRange::new(None, Some(40.0)));
        let order = candidates
            .iter()
            .map(|candidate| candidate.wine.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["barolo", "rioja-reserva", "paso-zin", "mendoza-malbec"]);
    }

    #[tokio::test]
    async fn retrieval_failures_surface_as_errors() {
        let searcher = WineSearcher::new(
            Arc::new(KeywordEmbedder::new()),
            Arc::new(FailingCatalog),
            20,
        );
        let err = searcher.search(&query("red"), 3).await.expect_err("fails");
        assert!(matches!(err, PipCoreError::Retrieval(_)));

        let searcher = WineSearcher::new(
            Arc::new(FailingEmbedder),
            Arc::new(sample_catalog().await),
            20,
        );
        assert!(searcher.search(&query("red"), 3).await.is_err());
    }
}
