use async_trait::async_trait;
use std::sync::Arc;
use vizsql::chart_recommender::{role, ChartKind, ChartRecommender};
use vizsql::config::EngineConfig;
use vizsql::error::{EngineError, Result};
use vizsql::instruction::{extract, Instruction, Requirements};
use vizsql::llm::CompletionProvider;
use vizsql::record_synth::synthesize_insert;
use vizsql::result_set::{Cell, ResultSet};
use vizsql::rule_builder::{RuleBasedSqlBuilder, DEFAULT_SELECT};
use vizsql::sql_generator::{SqlIntentGenerator, SqlSource};
use vizsql::sql_validator::{validate, StatementKind};
use vizsql::summary::{operation_summary, query_summary};

/// Provider that answers every request with the same reply.
struct CannedProvider(std::result::Result<&'static str, &'static str>);

#[async_trait]
impl CompletionProvider for CannedProvider {
    async fn complete(&self, system_prompt: &str, _user: &str, max_tokens: u32, _temperature: f32) -> Result<String> {
        assert!(system_prompt.contains("表名：students"));
        assert_eq!(max_tokens, 800);
        match self.0 {
            Ok(reply) => Ok(reply.to_string()),
            Err(message) => Err(EngineError::Llm(message.to_string())),
        }
    }
}

fn generator(reply: std::result::Result<&'static str, &'static str>) -> SqlIntentGenerator {
    SqlIntentGenerator::new(Some(Arc::new(CannedProvider(reply))), &EngineConfig::default())
}

fn category_counts(rows: usize) -> ResultSet {
    ResultSet::new(
        vec!["major".to_string(), "人数".to_string()],
        (0..rows)
            .map(|i| vec![Cell::Text(format!("专业{}", i)), Cell::Int(i as i64 + 1)])
            .collect(),
    )
}

#[test]
fn test_rule_scenarios() {
    let builder = RuleBasedSqlBuilder::new();
    assert_eq!(
        builder.build("统计各学院人数"),
        "SELECT college, COUNT(*) as 人数 FROM students GROUP BY college ORDER BY 人数 DESC"
    );
    assert_eq!(builder.build("查询所有男生信息"), "SELECT * FROM students WHERE gender = '男'");
}

#[test]
fn test_small_category_counts_are_bar() {
    let config = ChartRecommender::new().recommend(&category_counts(5), &Instruction::default(), "SELECT major, 人数 FROM t");
    assert_eq!(config.chart_type, ChartKind::Bar);
    assert_eq!(config.get_field(role::X_AXIS), Some("major"));
    assert_eq!(config.get_field(role::Y_AXIS), Some("人数"));
}

#[test]
fn test_nullable_counts_are_bar() {
    let result = ResultSet::from_json_str(
        r#"[{"college":"计算机学院","人数":12},{"college":"文学院","人数":null},{"college":"理学院","人数":5}]"#,
    )
    .unwrap();
    let config = ChartRecommender::new().recommend(&result, &Instruction::default(), "");
    assert_eq!(config.chart_type, ChartKind::Bar);
    assert_eq!(config.get_field(role::X_AXIS), Some("college"));
    assert_eq!(config.get_field(role::Y_AXIS), Some("人数"));
}

#[test]
fn test_limit_requirement_is_pie() {
    let instruction = Instruction {
        requirements: Requirements {
            limit: Some(5),
            ..Requirements::default()
        },
        ..Instruction::default()
    };
    let config = ChartRecommender::new().recommend(&category_counts(8), &instruction, "");
    assert_eq!(config.chart_type, ChartKind::Pie);
    assert_eq!(config.extras["limit"], 5);
}

#[test]
fn test_chart_properties() {
    let recommender = ChartRecommender::new();

    let empty = ResultSet::new(vec!["major".to_string()], vec![]);
    assert_eq!(recommender.recommend(&empty, &extract("用折线图"), "").chart_type, ChartKind::None);

    let config = recommender.recommend(&category_counts(4), &extract("用折线图展示"), "");
    assert_eq!(config.chart_type, ChartKind::Line);

    let names = ResultSet::new(
        vec!["name".to_string(), "college".to_string()],
        vec![
            vec!["张三".into(), "计算机学院".into()],
            vec!["李四".into(), "经管学院".into()],
        ],
    );
    assert_eq!(recommender.recommend(&names, &Instruction::default(), "").chart_type, ChartKind::Pie);

    let large = category_counts(25);
    assert_eq!(recommender.recommend(&large, &Instruction::default(), "").chart_type, ChartKind::Table);
}

#[test]
fn test_extract_is_idempotent() {
    let text = "用柱状图展示，以学院为X轴，按人数降序排序，显示前5名，标题是学院人数";
    assert_eq!(extract(text), extract(text));
}

#[test]
fn test_synthesized_inserts_validate() {
    for _ in 0..20 {
        let sql = synthesize_insert();
        assert!(validate(&sql).ok);
        assert_eq!(StatementKind::of(&sql), StatementKind::Insert);
    }
}

#[tokio::test]
async fn test_malformed_ai_reply_uses_default_select() {
    let result = generator(Ok("Sure! Here's your SQL: SELECT * FROM"))
        .generate("查看所有学生")
        .await;
    assert_eq!(result.sql, DEFAULT_SELECT);
    assert_eq!(result.source, SqlSource::Rule);
    assert!(result.valid);
}

#[tokio::test]
async fn test_ai_failure_never_surfaces() {
    let result = generator(Err("502 Bad Gateway")).generate("查询所有男生信息").await;
    assert_eq!(result.source, SqlSource::Rule);
    assert_eq!(result.sql, "SELECT * FROM students WHERE gender = '男'");
}

#[tokio::test]
async fn test_query_to_summary() {
    let result = generator(Ok("SELECT major, COUNT(*) as 人数 FROM students GROUP BY major"))
        .generate("统计各专业人数，用饼图")
        .await;
    assert_eq!(result.source, SqlSource::Ai);

    let rows = category_counts(3);
    let recommendation = ChartRecommender::new().analyze(&rows, &result.sql, "统计各专业人数，用饼图");
    assert_eq!(recommendation.config.chart_type, ChartKind::Pie);
    assert_eq!(
        query_summary(rows.row_count(), &recommendation),
        "查询成功！找到 3 条记录。 已按您的要求生成饼图。"
    );
}

#[tokio::test]
async fn test_insert_to_operation_summary() {
    let result = generator(Ok("INSERT INTO students (name) VALUES"))
        .generate("随机插入2名2024级的学生")
        .await;
    assert_eq!(result.source, SqlSource::Synthesized);

    let kind = StatementKind::of(&result.sql);
    assert_eq!(
        operation_summary(kind, Some(2)).as_deref(),
        Some("插入成功！成功插入 2 条记录")
    );
}
