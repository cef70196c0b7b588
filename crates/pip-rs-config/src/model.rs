//! Configuration schema for Pip.

use serde::{Deserialize, Serialize};

/// Largest rolling history the core accepts.
pub const MAX_HISTORY_WINDOW: usize = 20;

/// Root config for the Pip assistant core.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PipConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub recommender: RecommenderConfig,
    #[serde(default)]
    pub decide: DecideConfig,
    #[serde(default)]
    pub photo: PhotoConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl PipConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> PipConfigBuilder {
        PipConfigBuilder::new()
    }
}

/// Builder for assembling a `PipConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct PipConfigBuilder {
    config: PipConfig,
}

impl PipConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipConfig::default(),
        }
    }

    pub fn assistant(mut self, assistant: AssistantConfig) -> Self {
        self.config.assistant = assistant;
        self
    }

    pub fn classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.config.classifier = classifier;
        self
    }

    pub fn recommender(mut self, recommender: RecommenderConfig) -> Self {
        self.config.recommender = recommender;
        self
    }

    pub fn decide(mut self, decide: DecideConfig) -> Self {
        self.config.decide = decide;
        self
    }

    pub fn photo(mut self, photo: PhotoConfig) -> Self {
        self.config.photo = photo;
        self
    }

    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = llm;
        self
    }

    pub fn data(mut self, data: DataConfig) -> Self {
        self.config.data = data;
        self
    }

    /// Finalize and return the built `PipConfig`.
    pub fn build(self) -> PipConfig {
        self.config
    }
}

/// Conversation-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub name: String,
    /// Number of history messages kept from each request (1..=20).
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            history_window: default_history_window(),
        }
    }
}

fn default_assistant_name() -> String {
    "Pip".to_string()
}

fn default_history_window() -> usize {
    10
}

/// Intent classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    /// Confidence below which an intent is treated as ambiguous.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// History messages shown to the model when lexical rules do not decide.
    #[serde(default = "default_context_messages")]
    pub context_messages: usize,
    /// Ask the completer when no lexical rule fires.
    #[serde(default = "default_true")]
    pub model_fallback: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            context_messages: default_context_messages(),
            model_fallback: true,
        }
    }
}

fn default_confidence_threshold() -> f32 {
    0.6
}

fn default_context_messages() -> usize {
    6
}

fn default_true() -> bool {
    true
}

/// Two-stage retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommenderConfig {
    /// Recommendations returned per request.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Nearest neighbours fetched before hard filtering and ranking.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    /// Knowledge chunks used as category context.
    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,
    /// Retry once with the most specific filter dropped when nothing matches.
    #[serde(default = "default_true")]
    pub relaxed_retry: bool,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            candidate_pool: default_candidate_pool(),
            knowledge_top_k: default_knowledge_top_k(),
            relaxed_retry: true,
        }
    }
}

fn default_top_n() -> usize {
    3
}

fn default_candidate_pool() -> usize {
    20
}

fn default_knowledge_top_k() -> usize {
    3
}

/// Decide handler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecideConfig {
    /// Score under which a pick is returned with an explicit hedge.
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f32,
}

impl Default for DecideConfig {
    fn default() -> Self {
        Self {
            min_relevance: default_min_relevance(),
        }
    }
}

fn default_min_relevance() -> f32 {
    0.35
}

/// Label photo settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoConfig {
    /// Below this confidence the label is treated as unread.
    #[serde(default = "default_photo_min_confidence")]
    pub min_confidence: f32,
    /// Below this confidence the identification is hedged.
    #[serde(default = "default_photo_confident_above")]
    pub confident_above: f32,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_photo_min_confidence(),
            confident_above: default_photo_confident_above(),
        }
    }
}

fn default_photo_min_confidence() -> f32 {
    0.3
}

fn default_photo_confident_above() -> f32 {
    0.5
}

/// Model provider settings used by the `pip` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Data file locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DataConfig {
    /// JSONL catalog of wines.
    #[serde(default)]
    pub catalog_path: Option<String>,
    /// JSONL knowledge chunks.
    #[serde(default)]
    pub knowledge_path: Option<String>,
    /// Directory for the file-backed cellar and profile stores.
    #[serde(default)]
    pub store_path: Option<String>,
}
