//! Catalog and knowledge fixtures.

use crate::embed::KeywordEmbedder;
use async_trait::async_trait;
use pip_rs_knowledge::{
    CatalogFilter, CatalogIndex, InMemoryCatalogIndex, KnowledgeChunk, KnowledgeError,
    KnowledgeIndex, ScoredChunk, ScoredWine,
};
use pip_rs_protocol::{Wine, WineType};

#[allow(clippy::too_many_arguments)]
fn wine(
    id: &str,
    name: &str,
    producer: &str,
    vintage: i32,
    wine_type: WineType,
    varietal: &str,
    country: &str,
    region: &str,
    price_usd: f64,
    rating: f32,
    characteristics: &[&str],
    flavor_notes: &[&str],
    description: &str,
) -> Wine {
    Wine {
        id: id.to_string(),
        name: name.to_string(),
        producer: producer.to_string(),
        vintage: Some(vintage),
        wine_type,
        varietal: varietal.to_string(),
        country: country.to_string(),
        region: region.to_string(),
        price_usd,
        rating: Some(rating),
        body: None,
        characteristics: characteristics.iter().map(|v| v.to_string()).collect(),
        flavor_notes: flavor_notes.iter().map(|v| v.to_string()).collect(),
        description: description.to_string(),
    }
}

/// Ten wines spanning the common types, regions and price points.
pub fn sample_wines() -> Vec<Wine> {
    vec![
        wine(
            "napa-cab",
            "Stag Ridge Napa Cabernet Sauvignon",
            "Stag Ridge",
            2019,
            WineType::Red,
            "Cabernet Sauvignon",
            "USA",
            "Napa Valley, California",
            38.0,
            4.5,
            &["bold", "full-bodied", "oaky"],
            &["blackcurrant", "cedar", "vanilla"],
            "A bold Napa Cabernet with ripe dark fruit, made for steak.",
        ),
        wine(
            "mendoza-malbec",
            "Catena Malbec",
            "Catena",
            2019,
            WineType::Red,
            "Malbec",
            "Argentina",
            "Mendoza",
            22.0,
            4.2,
            &["juicy", "smooth", "bold"],
            &["plum", "blackberry", "violet"],
            "Plush Malbec for grilled meats.",
        ),
        wine(
            "rioja-reserva",
            "Bodega Lomas Rioja Reserva",
            "Bodega Lomas",
            2016,
            WineType::Red,
            "Tempranillo",
            "Spain",
            "Rioja",
            28.0,
            4.1,
            &["earthy", "savory", "medium-bodied"],
            &["cherry", "leather", "tobacco"],
            "Classic aged Rioja with savory depth.",
        ),
        wine(
            "burgundy-pinot",
            "Domaine Clair Bourgogne Pinot Noir",
            "Domaine Clair",
            2020,
            WineType::Red,
            "Pinot Noir",
            "France",
            "Burgundy",
            45.0,
            4.3,
            &["earthy", "elegant", "light-bodied"],
            &["cherry", "mushroom", "forest floor"],
            "Silky red Burgundy for duck and mushrooms.",
        ),
        wine(
            "paso-zin",
            "Sunbaked Paso Robles Zinfandel",
            "Sunbaked",
            2021,
            WineType::Red,
            "Zinfandel",
            "USA",
            "Paso Robles, California",
            24.0,
            3.7,
            &["jammy", "bold", "spicy"],
            &["blackberry", "pepper", "raspberry"],
            "Big, jammy Zinfandel for barbecue.",
        ),
        wine(
            "barolo",
            "Cascina Nebbia Barolo",
            "Cascina Nebbia",
            2017,
            WineType::Red,
            "Nebbiolo",
            "Italy",
            "Piedmont",
            65.0,
            4.6,
            &["tannic", "structured", "earthy"],
            &["rose", "tar", "cherry"],
            "Structured Barolo that rewards patience.",
        ),
        wine(
            "loire-sancerre",
            "Domaine Vallon Sancerre",
            "Domaine Vallon",
            2022,
            WineType::White,
            "Sauvignon Blanc",
            "France",
            "Loire Valley",
            32.0,
            4.0,
            &["crisp", "mineral", "zesty"],
            &["grapefruit", "gooseberry", "flint"],
            "Racy Sancerre for oysters and goat cheese.",
        ),
        wine(
            "sonoma-chardonnay",
            "Coastline Sonoma Chardonnay",
            "Coastline",
            2021,
            WineType::White,
            "Chardonnay",
            "USA",
            "Sonoma, California",
            26.0,
            3.9,
            &["buttery", "oaky", "rich"],
            &["apple", "vanilla", "toast"],
            "Round Chardonnay for roast chicken.",
        ),
        wine(
            "veneto-prosecco",
            "Villa Bolle Prosecco",
            "Villa Bolle",
            2022,
            WineType::Sparkling,
            "Glera",
            "Italy",
            "Veneto",
            16.0,
            3.8,
            &["crisp", "fresh", "light-bodied"],
            &["pear", "apple", "blossom"],
            "Easy Prosecco for celebrations.",
        ),
        wine(
            "provence-rose",
            "Cote Azur Provence Rose",
            "Cote Azur",
            2023,
            WineType::Rose,
            "Grenache",
            "France",
            "Provence",
            19.0,
            4.0,
            &["dry", "fresh", "crisp"],
            &["strawberry", "melon", "citrus"],
            "Pale dry rosé for summer lunches.",
        ),
    ]
}

/// One wine from [`sample_wines`] by id.
///
/// Panics when the id is unknown; fixtures only.
pub fn sample_wine(id: &str) -> Wine {
    sample_wines()
        .into_iter()
        .find(|wine| wine.id == id)
        .unwrap_or_else(|| panic!("unknown sample wine {id}"))
}

/// [`sample_wines`] indexed with the [`KeywordEmbedder`].
pub async fn sample_catalog() -> InMemoryCatalogIndex {
    InMemoryCatalogIndex::from_wines(sample_wines(), &KeywordEmbedder::new())
        .await
        .expect("sample catalog")
}

/// Returns the same chunks for every query.
#[derive(Debug, Clone, Default)]
pub struct StubKnowledge {
    chunks: Vec<KnowledgeChunk>,
}

impl StubKnowledge {
    pub fn new(chunks: Vec<KnowledgeChunk>) -> Self {
        Self { chunks }
    }

    /// A knowledge base with a single passage.
    pub fn passage(heading: &str, text: &str) -> Self {
        Self::new(vec![KnowledgeChunk::new("stub-1", heading, text)])
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnowledgeIndex for StubKnowledge {
    async fn search(
        &self,
        _embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, KnowledgeError> {
        Ok(self
            .chunks
            .iter()
            .take(top_k)
            .cloned()
            .map(|chunk| ScoredChunk { chunk, score: 1.0 })
            .collect())
    }
}

/// Knowledge base that is always unreachable.
#[derive(Debug, Clone, Default)]
pub struct FailingKnowledge;

#[async_trait]
impl KnowledgeIndex for FailingKnowledge {
    async fn search(
        &self,
        _embedding: &[f32],
        _top_k: usize,
    ) -> Result<Vec<ScoredChunk>, KnowledgeError> {
        Err(KnowledgeError::Unavailable("knowledge base offline".to_string()))
    }
}

/// Catalog that is always unreachable.
#[derive(Debug, Clone, Default)]
pub struct FailingCatalog;

#[async_trait]
impl CatalogIndex for FailingCatalog {
    async fn search(
        &self,
        _embedding: &[f32],
        _filter: &CatalogFilter,
        _top_k: usize,
    ) -> Result<Vec<ScoredWine>, KnowledgeError> {
        Err(KnowledgeError::Unavailable("catalog offline".to_string()))
    }

    async fn get(&self, _wine_id: &str) -> Result<Option<Wine>, KnowledgeError> {
        Err(KnowledgeError::Unavailable("catalog offline".to_string()))
    }

    async fn find_by_name(&self, _name: &str) -> Result<Option<Wine>, KnowledgeError> {
        Err(KnowledgeError::Unavailable("catalog offline".to_string()))
    }
}
