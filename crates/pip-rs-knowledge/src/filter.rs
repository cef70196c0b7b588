//! Hard catalog filters applied regardless of similarity.

use pip_rs_protocol::{PriceRange, SearchQuery, Wine, WineType};

/// Constraints a candidate must satisfy to be returned.
///
/// Price bounds are inclusive, type is an exact match, and region, country and
/// varietal are case-insensitive substring matches. Country also matches the
/// region field so "California" works as either.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    pub price: PriceRange,
    pub wine_type: Option<WineType>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub varietal: Option<String>,
}

impl CatalogFilter {
    pub fn from_query(query: &SearchQuery) -> Self {
        Self {
            price: query.price_range,
            wine_type: query.wine_type_filter,
            region: query.region_filter.clone(),
            country: query.country_filter.clone(),
            varietal: query.varietal_filter.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_unbounded()
            && self.wine_type.is_none()
            && self.region.is_none()
            && self.country.is_none()
            && self.varietal.is_none()
    }

    pub fn matches(&self, wine: &Wine) -> bool {
        if !self.price.contains(wine.price_usd) {
            return false;
        }
        if let Some(wine_type) = self.wine_type
            && wine.wine_type != wine_type
        {
            return false;
        }
        if let Some(region) = &self.region
            && !contains_ignore_case(&wine.region, region)
        {
            return false;
        }
        if let Some(country) = &self.country
            && !contains_ignore_case(&wine.country, country)
            && !contains_ignore_case(&wine.region, country)
        {
            return false;
        }
        if let Some(varietal) = &self.varietal
            && !contains_ignore_case(&wine.varietal, varietal)
        {
            return false;
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wine(price: f64, wine_type: WineType, region: &str, country: &str) -> Wine {
        Wine {
            id: "w".to_string(),
            name: "Test".to_string(),
            producer: String::new(),
            vintage: None,
            wine_type,
            varietal: "Cabernet Sauvignon".to_string(),
            country: country.to_string(),
            region: region.to_string(),
            price_usd: price,
            rating: None,
            body: None,
            characteristics: Vec::new(),
            flavor_notes: Vec::new(),
            description: String::new(),
        }
    }

    #[test]
    fn price_and_type_are_hard_filters() {
        let filter = CatalogFilter {
            price: PriceRange::new(None, Some(40.0)),
            wine_type: Some(WineType::Red),
            ..CatalogFilter::default()
        };
        assert!(filter.matches(&wine(40.0, WineType::Red, "Napa Valley", "USA")));
        assert!(!filter.matches(&wine(41.0, WineType::Red, "Napa Valley", "USA")));
        assert!(!filter.matches(&wine(20.0, WineType::White, "Napa Valley", "USA")));
    }

    #[test]
    fn country_matches_region_field() {
        let filter = CatalogFilter {
            country: Some("california".to_string()),
            ..CatalogFilter::default()
        };
        assert!(filter.matches(&wine(30.0, WineType::Red, "Napa Valley, California", "USA")));
        assert!(!filter.matches(&wine(30.0, WineType::Red, "Mendoza", "Argentina")));
    }

    #[test]
    fn varietal_is_substring_match() {
        let filter = CatalogFilter {
            varietal: Some("cabernet".to_string()),
            ..CatalogFilter::default()
        };
        assert!(filter.matches(&wine(30.0, WineType::Red, "Napa", "USA")));
        assert!(!filter.is_empty());
    }
}
