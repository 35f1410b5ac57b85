pub mod answer_cache;
pub mod prompt_builder;
pub mod question_pipeline;
pub mod sql_extractor;

#[cfg(test)]
pub(crate) mod test_support;
