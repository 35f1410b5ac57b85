use crate::domain::prompt::PromptPair;
use crate::domain::query_result::QueryResult;
use crate::domain::schema::TableSchema;

/// Wraps the user question inside the SQL prompt.
pub const QUESTION_DELIMITER: &str = "```";

/// Builds the prompts for both completion stages. Pure string formatting.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema: TableSchema,
    dialect: String,
    default_sql: String,
    answer_language: String,
}

impl PromptBuilder {
    pub fn new(
        schema: TableSchema,
        dialect: impl Into<String>,
        default_sql: impl Into<String>,
        answer_language: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            dialect: dialect.into(),
            default_sql: default_sql.into(),
            answer_language: answer_language.into(),
        }
    }

    pub fn build_sql_prompt(&self, question: &str) -> PromptPair {
        let system_context = format!("You are a {} database expert.", self.dialect);

        let instruction = format!(
            "The user request is delimited by {delim}. \
Your task is to return one SQL query that retrieves the information the user asks for from the database.\n\
Return ONLY the SQL code, and make the query return only the information the user needs.\n\n\
Background:\n\
1. The table name is {table}.\n\
2. The table columns are ({columns}).\n\n\
If the request does not describe a specific query, return exactly the following SQL as the default result:\n\
{default_sql};\n\n\
User request: {delim}{question}{delim}",
            delim = QUESTION_DELIMITER,
            table = self.schema.name,
            columns = self.schema.column_list(),
            default_sql = self.default_sql,
            question = question,
        );

        PromptPair::new(instruction, Some(system_context))
    }

    pub fn build_answer_prompt(&self, question: &str, result: &QueryResult) -> PromptPair {
        let system_context = format!(
            "You are a data analyst who explains query results to non-technical users. Always answer in {}.",
            self.answer_language
        );

        let instruction = format!(
            "The user asked: {delim}{question}{delim}\n\n\
The following rows were returned from the {table} table ({count} row(s)):\n\
{rows}\n\n\
Answer the user's question in {language} using only these rows. \
Be concise and do not mention SQL.",
            delim = QUESTION_DELIMITER,
            question = question,
            table = self.schema.name,
            count = result.row_count(),
            rows = result.render(),
            language = self.answer_language,
        );

        PromptPair::new(instruction, Some(system_context))
    }
}
