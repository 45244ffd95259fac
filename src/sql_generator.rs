//! Natural-language → SQL orchestration.
//!
//! AI first when a provider is configured, rule-based otherwise. Every path
//! ends in a structurally valid statement (or the delete-refusal comment) and
//! records where it came from. Collaborator errors never reach the caller.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::llm::{CompletionProvider, LlmClient};
use crate::prompts::{sql_system_prompt, sql_user_prompt};
use crate::record_synth::RecordSynthesizer;
use crate::rule_builder::{RuleBasedSqlBuilder, DEFAULT_SELECT};
use crate::schema::TableSchema;
use crate::sql_validator::{is_insert_complete, starts_with_statement_keyword, SqlValidator, StatementKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlSource {
    Ai,
    Rule,
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlGenerationResult {
    pub sql: String,
    pub source: SqlSource,
    pub valid: bool,
}

/// Statement openings; a line is cut at the earliest one it contains. Words
/// that also occur in prose only count mid-line with their clause shape.
const LEADING_KEYWORDS: &[&str] = &[
    r"\bSELECT\b",
    r"\bINSERT\s+INTO\b",
    r"^UPDATE\b",
    r"\bUPDATE\s+\w+\s+SET\b",
    r"^DELETE\b",
    r"\bDELETE\s+FROM\b",
    r"\bWITH\s+\w+\s+AS\s*\(",
    r"\bCREATE\s+(?:TABLE|INDEX|VIEW)\b",
    r"\bALTER\s+TABLE\b",
    r"\bDROP\s+(?:TABLE|INDEX|VIEW)\b",
];

/// Lines without a statement opening survive only if they carry a clause word
/// or start with a connective.
const CLAUSE_WORDS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "ORDER", "LIMIT", "JOIN", "SET", "VALUES",
];
const CONNECTIVES: &[&str] = &["AND", "OR", "ON", "HAVING"];

/// A statement ending in one of these was cut off mid-clause.
const DANGLING_KEYWORDS: &[&str] = &[
    "FROM", "WHERE", "AND", "OR", "BY", "JOIN", "ON", "SET", "INTO", "VALUES",
];

const COMMENT_PREFIXES: &[&str] = &["--", "/*", "*/", "#"];

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?i)```(?:sql)?\s*").unwrap();
    static ref KEYWORD_PATTERNS: Vec<Regex> = LEADING_KEYWORDS
        .iter()
        .map(|kw| Regex::new(&format!("(?i){}", kw)).unwrap())
        .collect();
    static ref CLAUSE_LINE: Regex = Regex::new(&format!(
        r"(?i)\b(?:{})\b|^(?:{})\b",
        CLAUSE_WORDS.join("|"),
        CONNECTIVES.join("|")
    ))
    .unwrap();
    static ref FROM_WITHOUT_TARGET: Regex =
        Regex::new(r"(?i)\bFROM\s*(?:$|;|\b(?:WHERE|GROUP|ORDER|LIMIT|JOIN)\b)").unwrap();
}

/// Strip fences and prose from a model reply, keeping the SQL-looking parts of
/// each line, joined with single spaces.
pub fn clean_ai_output(raw: &str) -> String {
    let unfenced = CODE_FENCE.replace_all(raw, "");

    let mut kept: Vec<&str> = Vec::new();
    for line in unfenced.lines() {
        let line = line.trim();
        if line.is_empty() || COMMENT_PREFIXES.iter().any(|p| line.starts_with(p)) {
            continue;
        }

        let opening = KEYWORD_PATTERNS
            .iter()
            .filter_map(|re| re.find(line))
            .min_by_key(|m| m.start());
        if let Some(m) = opening {
            kept.push(&line[m.start()..]);
            continue;
        }

        // value tuples and argument lists wrapped onto their own lines
        let continues_previous = kept
            .last()
            .map_or(false, |prev| prev.ends_with(',') || prev.ends_with('('));
        if continues_previous
            || line.starts_with(['(', ')', ','])
            || CLAUSE_LINE.is_match(line)
        {
            kept.push(line);
        }
    }

    kept.join(" ").trim().to_string()
}

/// True when `sql` stops right after a clause keyword or names no FROM target.
pub fn is_truncated(sql: &str) -> bool {
    let body = sql.trim().trim_end_matches(';').trim_end();
    let last = body
        .split_whitespace()
        .last()
        .map(str::to_uppercase)
        .unwrap_or_default();

    DANGLING_KEYWORDS.contains(&last.as_str()) || FROM_WITHOUT_TARGET.is_match(body)
}

pub struct SqlIntentGenerator {
    provider: Option<Arc<dyn CompletionProvider>>,
    schema: TableSchema,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    validator: SqlValidator,
    rules: RuleBasedSqlBuilder,
    synthesizer: RecordSynthesizer,
}

impl SqlIntentGenerator {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, config: &EngineConfig) -> Self {
        Self {
            provider,
            schema: TableSchema::students(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
            validator: SqlValidator::new(),
            rules: RuleBasedSqlBuilder::new(),
            synthesizer: RecordSynthesizer::new(),
        }
    }

    /// Generator with the HTTP client attached when the config holds a usable key.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let provider: Option<Arc<dyn CompletionProvider>> = if config.has_usable_key() {
            Some(Arc::new(LlmClient::new(config)?))
        } else {
            None
        };
        Ok(Self::new(provider, config))
    }

    pub fn rule_based() -> Self {
        Self::new(None, &EngineConfig::default())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_ai(&self) -> bool {
        self.provider.as_ref().map_or(false, |p| p.is_configured())
    }

    pub async fn generate(&self, text: &str) -> SqlGenerationResult {
        let provider = match &self.provider {
            Some(p) if p.is_configured() => p,
            _ => {
                info!("AI provider not configured, using rule-based SQL");
                return self.rule_result(text);
            }
        };

        let raw = match self.request_completion(provider.as_ref(), text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("AI SQL generation failed, falling back to rules: {}", e);
                return self.rule_result(text);
            }
        };
        debug!("Raw AI reply: {}", raw);

        let (sql, source) = self.settle(&raw);
        let verdict = self.validator.validate(&sql);
        if !verdict.ok {
            warn!(
                "Generated SQL rejected ({}), falling back to rules: {}",
                verdict.reason.unwrap_or_default(),
                sql
            );
            return self.rule_result(text);
        }

        info!("Generated SQL ({:?}): {}", source, sql);
        SqlGenerationResult {
            sql,
            source,
            valid: true,
        }
    }

    /// Rule path only, regardless of provider.
    pub fn generate_offline(&self, text: &str) -> SqlGenerationResult {
        self.rule_result(text)
    }

    async fn request_completion(&self, provider: &dyn CompletionProvider, text: &str) -> Result<String> {
        let system_prompt = sql_system_prompt(&self.schema);
        let user_prompt = sql_user_prompt(text);

        let call = provider.complete(&system_prompt, &user_prompt, self.max_tokens, self.temperature);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(reply) => reply,
            Err(_) => Err(EngineError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Turn a raw reply into a candidate statement and its provenance.
    fn settle(&self, raw: &str) -> (String, SqlSource) {
        let cleaned = clean_ai_output(raw);

        if StatementKind::of(&cleaned) == StatementKind::Insert && !is_insert_complete(&cleaned) {
            warn!("Incomplete INSERT from AI, synthesizing records: {}", cleaned);
            return (self.synthesizer.synthesize_insert(), SqlSource::Synthesized);
        }

        if cleaned.is_empty() || !starts_with_statement_keyword(&cleaned) || is_truncated(&cleaned) {
            warn!("Unusable AI SQL '{}', using default select", cleaned);
            return (DEFAULT_SELECT.to_string(), SqlSource::Rule);
        }

        (cleaned, SqlSource::Ai)
    }

    /// The rule builder is trusted as-is, the delete-refusal comment included.
    fn rule_result(&self, text: &str) -> SqlGenerationResult {
        SqlGenerationResult {
            sql: self.rules.build(text),
            source: SqlSource::Rule,
            valid: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedProvider {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, _system: &str, user: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(user.starts_with("请为以下问题生成SQL查询："));
            match self.script {
                Script::Reply(text) => Ok(text.to_string()),
                Script::Fail => Err(EngineError::Llm("connection refused".to_string())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("SELECT 1".to_string())
                }
            }
        }
    }

    struct Unconfigured;

    #[async_trait]
    impl CompletionProvider for Unconfigured {
        fn is_configured(&self) -> bool {
            false
        }

        async fn complete(&self, _: &str, _: &str, _: u32, _: f32) -> Result<String> {
            panic!("unconfigured provider must not be called");
        }
    }

    fn generator(provider: Arc<dyn CompletionProvider>) -> SqlIntentGenerator {
        SqlIntentGenerator::new(Some(provider), &EngineConfig::default())
    }

    #[test]
    fn test_clean_ai_output() {
        assert_eq!(
            clean_ai_output("```sql\nSELECT name\nFROM students\nWHERE gender = '男'\n```"),
            "SELECT name FROM students WHERE gender = '男'"
        );
        assert_eq!(
            clean_ai_output("Sure! Here's your SQL: SELECT * FROM"),
            "SELECT * FROM"
        );
        assert_eq!(
            clean_ai_output("-- all students\nHere is the query with a filter: select * from students"),
            "select * from students"
        );
        assert_eq!(clean_ai_output("I cannot help with that."), "");
        assert_eq!(
            clean_ai_output("I'll update the record:\nUPDATE students SET phone = '1' WHERE name = '张三'"),
            "UPDATE students SET phone = '1' WHERE name = '张三'"
        );
    }

    #[test]
    fn test_clean_keeps_outer_statement() {
        let delete = "DELETE FROM students WHERE id IN (SELECT id FROM students WHERE grade = '2022级')";
        assert_eq!(clean_ai_output(delete), delete);

        let cte = "WITH t AS (SELECT * FROM students) SELECT * FROM t";
        assert_eq!(clean_ai_output(cte), cte);
        assert_eq!(
            clean_ai_output(&format!("Here you go: {}", cte)),
            cte
        );
    }

    #[test]
    fn test_clean_multi_line_statements() {
        assert_eq!(
            clean_ai_output("UPDATE students\nSET phone = '13900000000'\nWHERE name = '张三'"),
            "UPDATE students SET phone = '13900000000' WHERE name = '张三'"
        );
        assert_eq!(
            clean_ai_output("DELETE\nFROM students\nWHERE id = 3"),
            "DELETE FROM students WHERE id = 3"
        );

        let insert = clean_ai_output(
            "```sql\nINSERT INTO students (name, grade)\nVALUES\n('张三', '2024级'),\n('李四', '2023级');\n```",
        );
        assert_eq!(
            insert,
            "INSERT INTO students (name, grade) VALUES ('张三', '2024级'), ('李四', '2023级');"
        );
        assert!(is_insert_complete(&insert));

        assert_eq!(
            clean_ai_output("SELECT * FROM students\nWHERE gender = '男'\nAND grade = '2024级'"),
            "SELECT * FROM students WHERE gender = '男' AND grade = '2024级'"
        );
    }

    #[test]
    fn test_truncation() {
        assert!(is_truncated("SELECT * FROM"));
        assert!(is_truncated("SELECT * FROM students WHERE"));
        assert!(is_truncated("SELECT * FROM students ORDER BY;"));
        assert!(is_truncated("SELECT * FROM WHERE id = 1"));
        assert!(!is_truncated("SELECT * FROM students"));
        assert!(!is_truncated("SELECT COUNT(*) as 总人数 FROM students"));
        assert!(!is_truncated("SELECT 1"));
    }

    #[tokio::test]
    async fn test_ai_reply_is_cleaned() {
        let provider = ScriptedProvider::new(Script::Reply(
            "```sql\nSELECT college, COUNT(*) as 人数 FROM students GROUP BY college\n```",
        ));
        let result = generator(provider.clone()).generate("统计各学院人数").await;
        assert_eq!(result.source, SqlSource::Ai);
        assert!(result.valid);
        assert_eq!(result.sql, "SELECT college, COUNT(*) as 人数 FROM students GROUP BY college");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_truncated_reply_uses_default_select() {
        let provider = ScriptedProvider::new(Script::Reply("Sure! Here's your SQL: SELECT * FROM"));
        let result = generator(provider).generate("查询所有男生信息").await;
        assert_eq!(result.sql, DEFAULT_SELECT);
        assert_eq!(result.source, SqlSource::Rule);
        assert!(result.valid);
    }

    #[tokio::test]
    async fn test_incomplete_insert_is_synthesized() {
        let provider = ScriptedProvider::new(Script::Reply(
            "INSERT INTO students (name, student_id) VALUES ('张三', '2024001'), ('李四'",
        ));
        let result = generator(provider).generate("随机插入2名2024级的学生").await;
        assert_eq!(result.source, SqlSource::Synthesized);
        assert!(result.valid);
        assert!(is_insert_complete(&result.sql));
    }

    #[tokio::test]
    async fn test_multi_line_replies_stay_ai() {
        let provider = ScriptedProvider::new(Script::Reply(
            "UPDATE students\nSET phone = '13900000000'\nWHERE name = '张三'",
        ));
        let result = generator(provider).generate("修改张三的电话为13900000000").await;
        assert_eq!(result.source, SqlSource::Ai);
        assert_eq!(result.sql, "UPDATE students SET phone = '13900000000' WHERE name = '张三'");

        let provider = ScriptedProvider::new(Script::Reply(
            "INSERT INTO students (name, grade)\nVALUES ('张三', '2024级'),\n('李四', '2023级')",
        ));
        let result = generator(provider).generate("添加张三和李四两个学生").await;
        assert_eq!(result.source, SqlSource::Ai);
        assert!(result.sql.contains("('李四', '2023级')"));
    }

    #[tokio::test]
    async fn test_subquery_delete_is_not_rewritten() {
        let reply = "DELETE FROM students WHERE id IN (SELECT id FROM students WHERE grade = '2022级')";
        let result = generator(ScriptedProvider::new(Script::Reply(reply)))
            .generate("删除2022级的学生")
            .await;
        assert_eq!(result.source, SqlSource::Ai);
        assert_eq!(result.sql, reply);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_rules() {
        let provider = ScriptedProvider::new(Script::Fail);
        let result = generator(provider).generate("统计各学院人数").await;
        assert_eq!(result.source, SqlSource::Rule);
        assert_eq!(
            result.sql,
            "SELECT college, COUNT(*) as 人数 FROM students GROUP BY college ORDER BY 人数 DESC"
        );
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_rules() {
        let provider = ScriptedProvider::new(Script::Hang);
        let result = generator(provider)
            .with_timeout(Duration::from_millis(50))
            .generate("查询所有男生信息")
            .await;
        assert_eq!(result.source, SqlSource::Rule);
        assert_eq!(result.sql, "SELECT * FROM students WHERE gender = '男'");
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_skipped() {
        let result = generator(Arc::new(Unconfigured)).generate("删除张三").await;
        assert_eq!(result.source, SqlSource::Rule);
        assert!(result.sql.starts_with("--"));
        assert!(result.valid);
    }

    #[tokio::test]
    async fn test_rule_based_without_provider() {
        let generator = SqlIntentGenerator::rule_based();
        assert!(!generator.has_ai());
        let result = generator.generate("按学号降序排列").await;
        assert_eq!(result.sql, "SELECT * FROM students ORDER BY student_id DESC");
        assert!(result.valid);
    }

    #[test]
    fn test_from_config_without_key_has_no_ai() {
        let config = EngineConfig::default().with_api_key("your_api_key_here");
        let generator = SqlIntentGenerator::from_config(&config).unwrap();
        assert!(!generator.has_ai());
    }

    #[test]
    fn test_serialized_source() {
        let result = SqlGenerationResult {
            sql: DEFAULT_SELECT.to_string(),
            source: SqlSource::Synthesized,
            valid: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "synthesized");
    }
}
