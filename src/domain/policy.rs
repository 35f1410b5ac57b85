/// Statement executed whenever the generated one is unusable.
pub const DEFAULT_SQL: &str = "SELECT * FROM forecast_result LIMIT 1";

/// Answer returned when the synthesis call fails transiently.
pub const DEFAULT_ANSWER: &str =
    "Sorry, the answer service is temporarily unavailable. Please try again later.";

/// Last-resort values substituted by the pipeline. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPolicy {
    pub sql: String,
    pub answer: String,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            sql: DEFAULT_SQL.to_string(),
            answer: DEFAULT_ANSWER.to_string(),
        }
    }
}
