//! Deterministic recommendation explanations with per-clause provenance.
//!
//! The first sentence describes the wine from its own attributes, optionally
//! framed as what its region or style is known for when the retrieved
//! category knowledge names the same descriptors. The second sentence only
//! echoes terms found verbatim in the user's request.

use crate::entities;
use crate::lexicon::{self, Normalized};
use crate::phrasing::{dollars, natural_list};
use pip_rs_protocol::{Provenance, SearchQuery, Wine};

const MAX_DESCRIPTORS: usize = 3;

/// Explanation text and the sources its clauses came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub text: String,
    pub provenance: Vec<Provenance>,
}

/// Explain why `wine` answers `query`.
pub fn explain(query: &SearchQuery, wine: &Wine) -> Explanation {
    let mut provenance = Vec::new();
    let characteristics = wine
        .characteristics
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>();
    let flavors = wine
        .flavor_notes
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .take(MAX_DESCRIPTORS)
        .collect::<Vec<_>>();

    let knowledge = Normalized::new(&query.category_knowledge);
    let known_for = lexicon::find_descriptors(&knowledge)
        .into_iter()
        .filter(|descriptor| wine.descriptors().contains(descriptor))
        .take(MAX_DESCRIPTORS)
        .collect::<Vec<_>>();

    let subject = short_name(wine);
    let notes = if flavors.is_empty() {
        String::new()
    } else {
        format!(", with notes of {}", natural_list(&flavors))
    };
    let first = if !known_for.is_empty() {
        provenance.push(Provenance::CategoryKnowledge);
        provenance.push(Provenance::WineAttributes);
        let framing = if mentions_region(&knowledge, wine) {
            "the region"
        } else {
            "the style"
        };
        format!(
            "This {subject} has the {} character {framing} is known for{notes}.",
            natural_list(&known_for)
        )
    } else if !characteristics.is_empty() || !flavors.is_empty() {
        provenance.push(Provenance::WineAttributes);
        let described = characteristics
            .iter()
            .take(MAX_DESCRIPTORS)
            .cloned()
            .collect::<Vec<_>>();
        if described.is_empty() {
            format!("This {subject} shows notes of {}.", natural_list(&flavors))
        } else {
            format!("This {subject} is {}{notes}.", natural_list(&described))
        }
    } else {
        provenance.push(Provenance::WineAttributes);
        format!("This {subject} is one of the closest matches in the catalog.")
    };

    let mut text = first;
    if let Some(second) = user_clause(query, wine) {
        provenance.push(Provenance::UserRequest);
        text.push(' ');
        text.push_str(&second);
    }
    Explanation { text, provenance }
}

/// Echo of the request: stated food, occasion and descriptors the wine has,
/// plus the budget when the request gave one.
fn user_clause(query: &SearchQuery, wine: &Wine) -> Option<String> {
    let request = Normalized::new(&query.user_request);
    let descriptors = wine.descriptors();
    let mut terms = Vec::new();
    for term in [query.food_pairing.as_deref(), query.occasion.as_deref()]
        .into_iter()
        .flatten()
    {
        let term = term.to_lowercase();
        if request.has(&term) {
            terms.push(term);
        }
    }
    for descriptor in lexicon::find_descriptors(&request) {
        if descriptors.contains(&descriptor) && !terms.contains(&descriptor) {
            terms.push(descriptor);
        }
    }

    let budget = !query.price_range.is_unbounded()
        && entities::extract(&query.user_request).has_price()
        && query.price_range.contains(wine.price_usd);
    let price = dollars(wine.price_usd);
    match (terms.is_empty(), budget) {
        (true, false) => None,
        (true, true) => Some(format!("At {price} it stays within your budget.")),
        (false, false) => Some(format!(
            "You mentioned {}, and it fits the bill.",
            natural_list(&terms)
        )),
        (false, true) => Some(format!(
            "You mentioned {}, and at {price} it stays within your budget.",
            natural_list(&terms)
        )),
    }
}

/// "Napa Cabernet Sauvignon" from region "Napa Valley, California".
fn short_name(wine: &Wine) -> String {
    let place = wine
        .region
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches(" Valley")
        .to_string();
    match (place.is_empty(), wine.varietal.trim().is_empty()) {
        (false, false) => format!("{place} {}", wine.varietal.trim()),
        (true, false) => wine.varietal.trim().to_string(),
        _ => wine.name.clone(),
    }
}

fn mentions_region(knowledge: &Normalized, wine: &Wine) -> bool {
    let place = wine.region.split(',').next().unwrap_or_default();
    let place = Normalized::new(place);
    place
        .tokens()
        .next()
        .is_some_and(|first| first.len() >= 3 && knowledge.has(first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_protocol::{PriceRange, WineType};
    use pip_rs_test_utils::{sample_wine, sample_wines};
    use pretty_assertions::assert_eq;

    fn query(request: &str, knowledge: &str) -> SearchQuery {
        SearchQuery {
            query_text: request.to_string(),
            category_knowledge: knowledge.to_string(),
            user_request: request.to_string(),
            ..SearchQuery::default()
        }
    }

    #[test]
    fn category_knowledge_is_framed_as_education() {
        let query = SearchQuery {
            country_filter: Some("California".to_string()),
            wine_type_filter: Some(WineType::Red),
            ..query(
                "California red",
                "Napa Valley: Napa Cabernet is known for bold, oaky reds with ripe dark fruit.",
            )
        };
        let explanation = explain(&query, &sample_wine("napa-cab"));
        assert_eq!(
            explanation.text,
            "This Napa Cabernet Sauvignon has the bold and oaky character the region is known for, with notes of blackcurrant, cedar and vanilla."
        );
        assert!(!explanation.text.to_lowercase().contains("based on your"));
        assert_eq!(
            explanation.provenance,
            vec![Provenance::CategoryKnowledge, Provenance::WineAttributes]
        );
    }

    #[test]
    fn user_clause_cites_only_stated_terms() {
        let query = SearchQuery {
            price_range: PriceRange::new(None, Some(40.0)),
            food_pairing: Some("steak".to_string()),
            wine_type_filter: Some(WineType::Red),
            ..query("Red wine under $40 for steak", "")
        };
        let explanation = explain(&query, &sample_wine("napa-cab"));
        assert_eq!(
            explanation.text,
            "This Napa Cabernet Sauvignon is bold, full-bodied and oaky, with notes of blackcurrant, cedar and vanilla. You mentioned steak, and at $38 it stays within your budget."
        );
        assert!(explanation.provenance.contains(&Provenance::UserRequest));
    }

    #[test]
    fn stored_budget_is_never_presented_as_stated() {
        let query = SearchQuery {
            price_range: PriceRange::new(Some(20.0), Some(40.0)),
            ..query("something for tonight", "")
        };
        let explanation = explain(&query, &sample_wine("mendoza-malbec"));
        assert!(!explanation.text.contains("budget"));
        assert!(!explanation.text.contains("You mentioned"));
        assert_eq!(explanation.provenance, vec![Provenance::WineAttributes]);
    }

    #[test]
    fn mentioned_terms_always_trace_to_the_request() {
        let request = "something earthy and crisp for salmon";
        let query = SearchQuery {
            food_pairing: Some("salmon".to_string()),
            ..query(request, "Burgundy is earthy and elegant.")
        };
        for wine in sample_wines() {
            let text = explain(&query, &wine).text;
            if let Some((_, tail)) = text.split_once("You mentioned ") {
                let cited = tail.split(", and").next().unwrap_or_default();
                for term in cited.split([',', ' ']).filter(|t| !t.is_empty() && *t != "and") {
                    assert!(request.contains(term), "{term} not in request: {text}");
                }
            }
        }
    }
}
