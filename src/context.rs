//! Per-request context: language preferences and channel.

use crate::entity::EntityId;
use crate::settings::EngineSettings;

#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Language requested by the client.
    pub language_code: String,
    /// Default language of the active channel.
    pub channel_language_code: String,
    /// Process-wide default language, last in the fallback chain.
    pub default_language_code: String,
    pub channel_id: EntityId,
}

impl RequestContext {
    pub fn new(language_code: &str, channel_language_code: &str) -> Self {
        RequestContext {
            language_code: language_code.to_string(),
            channel_language_code: channel_language_code.to_string(),
            default_language_code: crate::settings::DEFAULT_LANGUAGE.to_string(),
            channel_id: EntityId::Int(1),
        }
    }

    /// Context whose last fallback is the configured `default_language`.
    pub fn from_settings(settings: &EngineSettings, language_code: &str, channel_language_code: &str) -> Self {
        Self::new(language_code, channel_language_code).with_default_language(&settings.default_language)
    }

    pub fn with_default_language(mut self, code: &str) -> Self {
        self.default_language_code = code.to_string();
        self
    }

    pub fn with_channel(mut self, channel_id: impl Into<EntityId>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// requested → channel default → process default, duplicates removed.
    pub fn language_chain(&self) -> Vec<&str> {
        let mut chain: Vec<&str> = Vec::with_capacity(3);
        for code in [
            self.language_code.as_str(),
            self.channel_language_code.as_str(),
            self.default_language_code.as_str(),
        ] {
            if !chain.contains(&code) {
                chain.push(code);
            }
        }
        chain
    }
}
