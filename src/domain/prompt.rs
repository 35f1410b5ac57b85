use serde::Serialize;

/// One stage's worth of prompt text. Built fresh for every completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub instruction: String,
    pub system_context: Option<String>,
}

impl PromptPair {
    pub fn new(instruction: String, system_context: Option<String>) -> Self {
        Self {
            instruction,
            system_context,
        }
    }
}
