pub mod chart_recommender;
pub mod column_classifier;
pub mod config;
pub mod error;
pub mod instruction;
pub mod llm;
pub mod prompts;
pub mod record_synth;
pub mod result_set;
pub mod rule_builder;
pub mod schema;
pub mod sql_generator;
pub mod sql_validator;
pub mod summary;

pub use chart_recommender::{ChartConfig, ChartKind, ChartRecommendation, ChartRecommender};
pub use column_classifier::{ClassifiedColumns, ColumnClassifier, ColumnKind, ColumnProfile};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use instruction::{ChartType, Instruction, RequirementExtractor, Requirements, SortOrder};
pub use llm::{CompletionProvider, LlmClient};
pub use record_synth::RecordSynthesizer;
pub use result_set::{Cell, ResultSet};
pub use rule_builder::RuleBasedSqlBuilder;
pub use sql_generator::{SqlGenerationResult, SqlIntentGenerator, SqlSource};
pub use sql_validator::{SqlValidator, StatementKind, ValidationVerdict};
