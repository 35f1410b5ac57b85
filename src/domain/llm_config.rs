use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    /// Sampling temperature. Both pipeline stages expect deterministic output.
    pub temperature: f32,
    /// Upper bound for a single completion request. `None` leaves the call
    /// unbounded, matching the single-attempt contract of the client.
    pub timeout_secs: Option<u64>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai-proxy.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            max_tokens: None,
            temperature: 0.0,
            timeout_secs: None,
        }
    }
}
