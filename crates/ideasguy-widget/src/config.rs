use std::env;

#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub api_base_url: String,
    /// Rendered as the bot's reply when a chat request fails.
    pub fallback_error: String,
    /// Seeds the log when no character could be activated at startup.
    pub starter_line: Option<String>,
    pub default_avatar: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_owned(),
            fallback_error: "Hmm. The idea machine coughed. Check the server logs.".to_owned(),
            starter_line: Some(
                "Idea blast: drop me a problem and I'll pitch 5 spicy solutions.".to_owned(),
            ),
            default_avatar: "/assets/ideas_guy.png".to_owned(),
        }
    }
}

impl WidgetConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env::var("IDEASGUY_API_URL").unwrap_or(defaults.api_base_url),
            default_avatar: env::var("IDEASGUY_DEFAULT_AVATAR").unwrap_or(defaults.default_avatar),
            ..defaults
        }
    }
}
