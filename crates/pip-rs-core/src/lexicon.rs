//! Word lists for lexical extraction and matching.

use pip_rs_protocol::WineType;

/// Lowercased message with punctuation folded to single spaces and padded
/// so phrase lookups respect word boundaries.
#[derive(Debug, Clone)]
pub struct Normalized {
    padded: String,
}

impl Normalized {
    pub fn new(text: &str) -> Self {
        let mut padded = String::with_capacity(text.len() + 2);
        padded.push(' ');
        let mut last_space = true;
        for ch in text.to_lowercase().chars() {
            if ch == '\'' || ch == '\u{2019}' {
                continue;
            }
            let keep = ch.is_alphanumeric() || ch == '$' || (ch == '.' && !last_space);
            if keep {
                padded.push(ch);
                last_space = false;
            } else if !last_space {
                padded.push(' ');
                last_space = true;
            }
        }
        let trimmed = padded.trim_end_matches(['.', ' ']).to_string();
        Self {
            padded: format!("{trimmed} ").replace(". ", " "),
        }
    }

    /// The normalized text without padding.
    pub fn as_str(&self) -> &str {
        self.padded.trim()
    }

    /// Whole-phrase match.
    pub fn has(&self, phrase: &str) -> bool {
        self.padded.contains(&format!(" {phrase} "))
    }

    pub fn has_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|phrase| self.has(phrase))
    }

    /// Byte offset of a whole-phrase match in the unpadded text.
    pub fn position(&self, phrase: &str) -> Option<usize> {
        self.padded.find(&format!(" {phrase} "))
    }

    pub fn starts_with_any(&self, phrases: &[&str]) -> bool {
        phrases
            .iter()
            .any(|phrase| self.padded.starts_with(&format!(" {phrase} ")))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.padded.split_whitespace()
    }

    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }
}

/// Tasting descriptors recognised in requests and notes.
pub const DESCRIPTORS: &[&str] = &[
    "acidic", "aromatic", "balanced", "bold", "bright", "buttery", "chewy", "complex", "creamy",
    "crisp", "delicate", "dry", "earthy", "elegant", "floral", "fresh", "fruity", "full-bodied",
    "grippy", "herbaceous", "jammy", "juicy", "lean", "light", "light-bodied", "medium-bodied",
    "mineral", "minerally", "oaky", "off-dry", "opulent", "peppery", "refreshing", "rich",
    "ripe", "round", "savory", "silky", "smoky", "smooth", "soft", "spicy", "structured",
    "sweet", "tannic", "tart", "velvety", "zesty",
];

/// Flavor notes recognised in tasting notes.
pub const FLAVORS: &[&str] = &[
    "apple", "apricot", "blackberry", "blackcurrant", "blueberry", "butter", "cedar", "cherry",
    "chocolate", "citrus", "coffee", "grapefruit", "honey", "leather", "lemon", "licorice",
    "melon", "mushroom", "peach", "pear", "pepper", "plum", "raspberry", "strawberry", "tobacco",
    "toast", "vanilla", "violet",
];

/// Words that flip a tasting-note clause to negative.
pub const NEGATIONS: &[&str] = &[
    "not", "no", "too", "didnt", "dont", "wasnt", "isnt", "lacked", "lacking", "without",
    "hate", "hated", "disliked", "overly", "never",
];

/// Grape varietals: alias, canonical name.
pub const VARIETALS: &[(&str, &str)] = &[
    ("cabernet sauvignon", "Cabernet Sauvignon"),
    ("cabernet franc", "Cabernet Franc"),
    ("cabernet", "Cabernet Sauvignon"),
    ("cab", "Cabernet Sauvignon"),
    ("merlot", "Merlot"),
    ("pinot noir", "Pinot Noir"),
    ("pinot grigio", "Pinot Grigio"),
    ("pinot gris", "Pinot Gris"),
    ("syrah", "Syrah"),
    ("shiraz", "Shiraz"),
    ("malbec", "Malbec"),
    ("zinfandel", "Zinfandel"),
    ("zin", "Zinfandel"),
    ("tempranillo", "Tempranillo"),
    ("sangiovese", "Sangiovese"),
    ("nebbiolo", "Nebbiolo"),
    ("grenache", "Grenache"),
    ("garnacha", "Grenache"),
    ("barbera", "Barbera"),
    ("gamay", "Gamay"),
    ("carmenere", "Carmenere"),
    ("petite sirah", "Petite Sirah"),
    ("chardonnay", "Chardonnay"),
    ("sauvignon blanc", "Sauvignon Blanc"),
    ("riesling", "Riesling"),
    ("chenin blanc", "Chenin Blanc"),
    ("viognier", "Viognier"),
    ("gewurztraminer", "Gewurztraminer"),
    ("albarino", "Albarino"),
    ("gruner veltliner", "Gruner Veltliner"),
    ("moscato", "Moscato"),
    ("glera", "Glera"),
];

/// Wine regions: alias, canonical name.
pub const REGIONS: &[(&str, &str)] = &[
    ("napa valley", "Napa Valley"),
    ("napa", "Napa Valley"),
    ("sonoma", "Sonoma"),
    ("paso robles", "Paso Robles"),
    ("willamette", "Willamette Valley"),
    ("bordeaux", "Bordeaux"),
    ("burgundy", "Burgundy"),
    ("bourgogne", "Burgundy"),
    ("champagne", "Champagne"),
    ("rhone", "Rhone"),
    ("loire", "Loire Valley"),
    ("sancerre", "Sancerre"),
    ("provence", "Provence"),
    ("alsace", "Alsace"),
    ("rioja", "Rioja"),
    ("ribera del duero", "Ribera del Duero"),
    ("priorat", "Priorat"),
    ("tuscany", "Tuscany"),
    ("chianti", "Chianti"),
    ("piedmont", "Piedmont"),
    ("barolo", "Barolo"),
    ("veneto", "Veneto"),
    ("mendoza", "Mendoza"),
    ("marlborough", "Marlborough"),
    ("barossa", "Barossa Valley"),
    ("mosel", "Mosel"),
    ("douro", "Douro"),
];

/// Countries and US states, including adjective forms: alias, canonical name.
pub const COUNTRIES: &[(&str, &str)] = &[
    ("france", "France"),
    ("french", "France"),
    ("italy", "Italy"),
    ("italian", "Italy"),
    ("spain", "Spain"),
    ("spanish", "Spain"),
    ("portugal", "Portugal"),
    ("portuguese", "Portugal"),
    ("germany", "Germany"),
    ("german", "Germany"),
    ("austria", "Austria"),
    ("austrian", "Austria"),
    ("argentina", "Argentina"),
    ("argentinian", "Argentina"),
    ("argentine", "Argentina"),
    ("chile", "Chile"),
    ("chilean", "Chile"),
    ("australia", "Australia"),
    ("australian", "Australia"),
    ("new zealand", "New Zealand"),
    ("south africa", "South Africa"),
    ("south african", "South Africa"),
    ("united states", "USA"),
    ("usa", "USA"),
    ("american", "USA"),
    ("california", "California"),
    ("californian", "California"),
    ("oregon", "Oregon"),
    ("washington state", "Washington"),
];

/// Foods: alias, canonical dish.
pub const FOODS: &[(&str, &str)] = &[
    ("steak", "steak"),
    ("ribeye", "steak"),
    ("beef", "beef"),
    ("burger", "burgers"),
    ("burgers", "burgers"),
    ("lamb", "lamb"),
    ("bbq", "barbecue"),
    ("barbecue", "barbecue"),
    ("ribs", "barbecue"),
    ("pork", "pork"),
    ("duck", "duck"),
    ("turkey", "turkey"),
    ("chicken", "chicken"),
    ("salmon", "salmon"),
    ("tuna", "tuna"),
    ("fish", "fish"),
    ("seafood", "seafood"),
    ("shellfish", "shellfish"),
    ("oysters", "oysters"),
    ("shrimp", "shrimp"),
    ("lobster", "lobster"),
    ("crab", "crab"),
    ("sushi", "sushi"),
    ("pasta", "pasta"),
    ("pizza", "pizza"),
    ("lasagna", "lasagna"),
    ("risotto", "risotto"),
    ("mushrooms", "mushrooms"),
    ("mushroom", "mushrooms"),
    ("cheese", "cheese"),
    ("charcuterie", "charcuterie"),
    ("salad", "salad"),
    ("curry", "curry"),
    ("thai", "thai food"),
    ("indian", "indian food"),
    ("tacos", "tacos"),
    ("mexican", "mexican food"),
    ("spicy food", "spicy food"),
    ("chocolate", "chocolate"),
    ("dessert", "dessert"),
    ("cake", "dessert"),
];

/// Occasions: alias, canonical occasion.
pub const OCCASIONS: &[(&str, &str)] = &[
    ("date night", "date night"),
    ("romantic", "date night"),
    ("anniversary", "date night"),
    ("dinner party", "dinner party"),
    ("celebration", "celebration"),
    ("celebrate", "celebration"),
    ("celebrating", "celebration"),
    ("birthday", "celebration"),
    ("wedding", "celebration"),
    ("party", "celebration"),
    ("new years", "celebration"),
    ("gift", "gift"),
    ("present", "gift"),
    ("weeknight", "casual"),
    ("casual", "casual"),
    ("everyday", "casual"),
    ("thanksgiving", "holiday"),
    ("christmas", "holiday"),
    ("holiday", "holiday"),
    ("picnic", "outdoor"),
    ("beach", "outdoor"),
    ("cookout", "outdoor"),
];

/// Wine type words: alias, type.
pub const TYPES: &[(&str, WineType)] = &[
    ("red", WineType::Red),
    ("reds", WineType::Red),
    ("white", WineType::White),
    ("whites", WineType::White),
    ("rose", WineType::Rose),
    ("rosé", WineType::Rose),
    ("pink", WineType::Rose),
    ("sparkling", WineType::Sparkling),
    ("bubbly", WineType::Sparkling),
    ("bubbles", WineType::Sparkling),
    ("champagne", WineType::Sparkling),
    ("prosecco", WineType::Sparkling),
    ("cava", WineType::Sparkling),
    ("dessert wine", WineType::Dessert),
    ("port", WineType::Dessert),
    ("sauternes", WineType::Dessert),
];

/// Canonical type implied by a varietal, when unambiguous.
pub fn varietal_type(varietal: &str) -> Option<WineType> {
    match varietal {
        "Chardonnay" | "Sauvignon Blanc" | "Riesling" | "Chenin Blanc" | "Viognier"
        | "Gewurztraminer" | "Albarino" | "Gruner Veltliner" | "Pinot Grigio" | "Pinot Gris" => {
            Some(WineType::White)
        }
        "Moscato" => Some(WineType::Dessert),
        "Glera" => Some(WineType::Sparkling),
        "Grenache" => None,
        _ => Some(WineType::Red),
    }
}

/// Terms that mark a message as being about wine at all.
pub const WINE_TERMS: &[&str] = &[
    "wine", "wines", "grape", "grapes", "vintage", "tannin", "tannins", "terroir", "decant",
    "decanting", "sommelier", "cork", "corked", "oak", "aging", "cellar", "bottle", "vineyard",
    "winery", "sulfites", "acidity", "varietal", "appellation", "blend", "pour", "glass",
];

/// Words that never identify a wine on their own.
pub const REFERENCE_STOPWORDS: &[&str] = &[
    "a", "an", "the", "my", "it", "its", "this", "that", "these", "those", "them", "one", "ones",
    "wine", "wines", "bottle", "bottles", "please", "to", "from", "of", "for", "and", "in",
    "first", "second", "third", "fourth", "fifth", "last", "other", "again", "about", "more",
    "me", "tell", "what", "is", "like", "some", "with", "on", "i", "just", "now",
];

/// First canonical value whose alias occurs in `text`, longest alias first.
pub fn find_alias<T: Copy>(text: &Normalized, table: &[(&str, T)]) -> Option<(usize, T)> {
    table
        .iter()
        .filter_map(|(alias, value)| text.position(alias).map(|pos| (pos, alias.len(), *value)))
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(pos, _, value)| (pos, value))
}

/// Descriptor and flavor words present in `text`, in vocabulary order.
pub fn find_descriptors(text: &Normalized) -> Vec<String> {
    DESCRIPTORS
        .iter()
        .chain(FLAVORS.iter())
        .filter(|word| text.has(&word.replace('-', " ")) || text.has(word))
        .map(|word| word.to_string())
        .collect()
}
