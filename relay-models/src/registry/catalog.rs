//! The fixed set of models the registry exposes.

use crate::ModelInfo;
use crate::providers::ProviderKind;

/// Identifier used when config names no default.
pub const DEFAULT_MODEL: &str = "qwen-qwq";

/// Every registry identifier, in declaration order.
pub const MODELS: [&str; 8] = [
    "gpt-4.1-mini",
    "claude-3-7-sonnet",
    "qwen-qwq",
    "grok-3-mini",
    "openrouter-deepseek-chat-v3",
    "openrouter-deepseek-r1",
    "openrouter-gemini-flash",
    "openrouter-llama-4-maverick",
];

/// Static description of one registry entry.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub provider: ProviderKind,
    /// Model string sent upstream.
    pub upstream: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Version string shown to users.
    pub api_version: &'static str,
    pub capabilities: &'static [&'static str],
    /// Wrap the handle with `think`-tag reasoning extraction.
    pub extract_reasoning: bool,
}

impl CatalogEntry {
    /// Metadata record for this entry.
    pub fn info(&self) -> ModelInfo {
        ModelInfo::builder(self.id, self.provider.display_name(), self.name)
            .description(self.description)
            .api_version(self.api_version)
            .capabilities(self.capabilities.iter().copied())
            .build()
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "gpt-4.1-mini",
        provider: ProviderKind::OpenAi,
        upstream: "gpt-4.1-mini",
        name: "GPT-4.1 Mini",
        description: "Compact version of OpenAI's GPT-4.1 with good balance of capabilities, including vision.",
        api_version: "gpt-4.1-mini",
        capabilities: &["Balance", "Creative", "Vision"],
        extract_reasoning: false,
    },
    CatalogEntry {
        id: "claude-3-7-sonnet",
        provider: ProviderKind::Anthropic,
        upstream: "claude-3-7-sonnet-20250219",
        name: "Claude 3.7 Sonnet",
        description: "Latest version of Anthropic's Claude 3.7 Sonnet with strong reasoning and coding capabilities.",
        api_version: "claude-3-7-sonnet-20250219",
        capabilities: &["Reasoning", "Efficient", "Agentic"],
        extract_reasoning: false,
    },
    CatalogEntry {
        id: "qwen-qwq",
        provider: ProviderKind::Groq,
        upstream: "qwen-qwq-32b",
        name: "Qwen QWQ",
        description: "Latest version of Alibaba's Qwen QWQ with strong reasoning and coding capabilities.",
        api_version: "qwen-qwq",
        capabilities: &["Reasoning", "Efficient", "Agentic"],
        extract_reasoning: true,
    },
    CatalogEntry {
        id: "grok-3-mini",
        provider: ProviderKind::Xai,
        upstream: "grok-3-mini-latest",
        name: "Grok 3 Mini",
        description: "Latest version of XAI's Grok 3 Mini with strong reasoning and coding capabilities.",
        api_version: "grok-3-mini-latest",
        capabilities: &["Reasoning", "Efficient", "Agentic"],
        extract_reasoning: false,
    },
    CatalogEntry {
        id: "openrouter-deepseek-chat-v3",
        provider: ProviderKind::OpenRouter,
        upstream: "deepseek/deepseek-chat-v3-0324:free",
        name: "DeepSeek Chat V3 (Free)",
        description: "DeepSeek's Chat V3 model via OpenRouter, strong at reasoning, coding, and general chat.",
        api_version: "deepseek/deepseek-chat-v3-0324:free",
        capabilities: &["Reasoning", "Coding", "General", "OpenRouter"],
        extract_reasoning: false,
    },
    CatalogEntry {
        id: "openrouter-deepseek-r1",
        provider: ProviderKind::OpenRouter,
        upstream: "deepseek/deepseek-r1:free",
        name: "DeepSeek R1 (Free)",
        description: "DeepSeek's R1 model via OpenRouter, excels at research, reasoning, and creative tasks.",
        api_version: "deepseek/deepseek-r1:free",
        capabilities: &["Research", "Reasoning", "Creative", "OpenRouter"],
        extract_reasoning: false,
    },
    CatalogEntry {
        id: "openrouter-gemini-flash",
        provider: ProviderKind::OpenRouter,
        upstream: "google/gemini-2.0-flash-exp:free",
        name: "Gemini 2.0 Flash (Free)",
        description: "Google's Gemini 2.0 Flash experimental model via OpenRouter, fast and efficient for general and vision tasks.",
        api_version: "google/gemini-2.0-flash-exp:free",
        capabilities: &["Fast", "Efficient", "Vision", "General", "OpenRouter"],
        extract_reasoning: false,
    },
    CatalogEntry {
        id: "openrouter-llama-4-maverick",
        provider: ProviderKind::OpenRouter,
        upstream: "meta-llama/llama-4-maverick:free",
        name: "Llama 4 Maverick (Free)",
        description: "Meta's Llama 4 Maverick model via OpenRouter, strong at reasoning, coding, and agentic tasks.",
        api_version: "meta-llama/llama-4-maverick:free",
        capabilities: &["Reasoning", "Coding", "Agentic", "OpenRouter"],
        extract_reasoning: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_model_list_in_order() {
        let ids: Vec<&str> = CATALOG.iter().map(|e| e.id).collect();
        assert_eq!(ids, MODELS);
    }

    #[test]
    fn default_model_is_catalogued() {
        assert!(MODELS.contains(&DEFAULT_MODEL));
    }

    #[test]
    fn exactly_one_entry_extracts_reasoning() {
        let wrapped: Vec<&str> = CATALOG
            .iter()
            .filter(|e| e.extract_reasoning)
            .map(|e| e.id)
            .collect();
        assert_eq!(wrapped, vec!["qwen-qwq"]);
    }

    #[test]
    fn entry_info_uses_provider_display_name() {
        let grok = CATALOG.iter().find(|e| e.id == "grok-3-mini").unwrap();
        let info = grok.info();
        assert_eq!(info.provider, "XAI");
        assert_eq!(info.api_version, "grok-3-mini-latest");
        assert_eq!(info.capabilities, vec!["Reasoning", "Efficient", "Agentic"]);
    }
}
