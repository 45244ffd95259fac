//! Chart recommendation for query results.
//!
//! Decision order:
//! 1. empty result → `none`
//! 2. explicit chart type in the request → that type's builder
//! 3. requirement hints without a chart type → chosen from the hints
//! 4. otherwise the heuristic rule table, first match wins, `table` as the
//!    terminal fallback

use crate::column_classifier::{ClassifiedColumns, ColumnClassifier, ColumnKind, ColumnProfile};
use crate::instruction::{ChartType, Instruction, RequirementExtractor, Requirements, SortOrder};
use crate::result_set::ResultSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Chart types the recommender can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    MultiBar,
    Table,
    None,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::MultiBar => "multi_bar",
            ChartKind::Table => "table",
            ChartKind::None => "none",
        }
    }

    /// Label shown to the user.
    pub fn display_name(&self) -> &'static str {
        match self {
            ChartKind::Bar => "柱状图",
            ChartKind::Line => "折线图",
            ChartKind::Pie => "饼图",
            ChartKind::Scatter => "散点图",
            ChartKind::MultiBar => "多系列柱状图",
            ChartKind::Table => "表格",
            ChartKind::None => "无",
        }
    }

    pub fn is_chart(&self) -> bool {
        !matches!(self, ChartKind::Table | ChartKind::None)
    }
}

/// Field roles used in `ChartConfig::fields`.
pub mod role {
    pub const X_AXIS: &str = "x_axis";
    pub const Y_AXIS: &str = "y_axis";
    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";
    pub const COLOR_BY: &str = "color_by";
}

/// Placeholder value field when no numeric column exists.
pub const COUNT_FIELD: &str = "count";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub chart_type: ChartKind,
    /// Role → column name (or the literal "count")
    pub fields: BTreeMap<String, String>,
    pub title: String,
    /// Display options: smoothing, sorting, limit, chart style, series, ...
    pub extras: Map<String, Value>,
}

impl ChartConfig {
    fn new(chart_type: ChartKind) -> Self {
        Self {
            chart_type,
            fields: BTreeMap::new(),
            title: String::new(),
            extras: Map::new(),
        }
    }

    pub fn none() -> Self {
        Self::new(ChartKind::None)
    }

    fn table() -> Self {
        let mut config = Self::new(ChartKind::Table);
        config.extras.insert("show_table".into(), json!(true));
        config
            .extras
            .insert("message".into(), json!("数据量较大，建议使用表格查看"));
        config
    }

    fn field(mut self, role: &str, column: &str) -> Self {
        self.fields.insert(role.to_string(), column.to_string());
        self
    }

    fn extra(mut self, key: &str, value: Value) -> Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    fn titled(mut self, title: String) -> Self {
        self.title = title;
        self
    }

    pub fn get_field(&self, role: &str) -> Option<&str> {
        self.fields.get(role).map(String::as_str)
    }

    pub fn style(&self) -> Option<&str> {
        self.extras.get("chart_style").and_then(Value::as_str)
    }
}

/// Recommendation plus how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRecommendation {
    pub config: ChartConfig,
    /// True when the explicit-type or requirements branch decided the chart
    pub instruction_followed: bool,
    pub instruction: Instruction,
}

/// Column facts every builder and rule looks at.
struct ChartContext<'a> {
    columns: &'a [String],
    profile: &'a ColumnProfile,
    numeric: Vec<&'a str>,
    categorical: Vec<&'a str>,
    datetime: Vec<&'a str>,
    row_count: usize,
    query_lower: String,
}

impl<'a> ChartContext<'a> {
    fn new(columns: &'a [String], profile: &'a ColumnProfile, row_count: usize, query_text: &str) -> Self {
        Self {
            columns,
            profile,
            numeric: profile.numeric(),
            categorical: profile.categorical(),
            datetime: profile.datetime(),
            row_count,
            query_lower: query_text.to_lowercase(),
        }
    }

    fn column(&self, index: usize) -> Option<&'a str> {
        self.columns.get(index).map(String::as_str)
    }

    /// First categorical column, else the first column, else `fallback`.
    fn category_or_first(&self, fallback: &'a str) -> &'a str {
        self.categorical
            .first()
            .copied()
            .or_else(|| self.column(0))
            .unwrap_or(fallback)
    }

    fn show_legend(&self) -> bool {
        self.numeric.len() > 1 || self.categorical.len() > 1
    }
}

// ── per-type builders ────────────────────────────────────────────────

fn bar_config(ctx: &ChartContext, req: &Requirements) -> ChartConfig {
    let x_axis = req
        .x_axis
        .clone()
        .unwrap_or_else(|| ctx.category_or_first("category").to_string());

    let mut config = ChartConfig::new(ChartKind::Bar);
    let y_axis = match (&req.y_axis, ctx.numeric.first()) {
        (Some(y), _) => y.clone(),
        (None, Some(n)) => n.to_string(),
        (None, None) => {
            config = config.extra("show_values", json!(true));
            COUNT_FIELD.to_string()
        }
    };

    if req.is_sorted() {
        let order = req.sort_order.unwrap_or(SortOrder::Desc);
        config = config
            .extra("sorted", json!(true))
            .extra("sort_order", json!(order.as_str()));
    }
    if let Some(limit) = req.limit {
        config = config.extra("limit", json!(limit));
    }

    config
        .field(role::X_AXIS, &x_axis)
        .field(role::Y_AXIS, &y_axis)
        .titled(format!("{} 按 {} 统计", y_axis, x_axis))
}

fn line_config(ctx: &ChartContext, req: &Requirements) -> ChartConfig {
    // a time column always wins the x axis
    let x_axis = ctx
        .datetime
        .first()
        .map(|d| d.to_string())
        .or_else(|| req.x_axis.clone())
        .unwrap_or_else(|| ctx.category_or_first("x").to_string());

    let y_axis = req
        .y_axis
        .clone()
        .or_else(|| ctx.numeric.first().map(|n| n.to_string()))
        .unwrap_or_else(|| "value".to_string());

    ChartConfig::new(ChartKind::Line)
        .field(role::X_AXIS, &x_axis)
        .field(role::Y_AXIS, &y_axis)
        .extra("smooth", json!(true))
        .titled(format!("{} 趋势图", y_axis))
}

const PIE_MAX_SLICES: usize = 10;

fn pie_config(ctx: &ChartContext, req: &Requirements) -> ChartConfig {
    let name = ctx.category_or_first("category");
    let value = ctx.numeric.first().copied().unwrap_or(COUNT_FIELD);
    let limit = req
        .limit
        .map(|n| n.min(PIE_MAX_SLICES))
        .unwrap_or(PIE_MAX_SLICES);

    ChartConfig::new(ChartKind::Pie)
        .field(role::NAME, name)
        .field(role::VALUE, value)
        .extra("limit", json!(limit))
        .titled(format!("{} 分布", name))
}

fn scatter_config(ctx: &ChartContext) -> ChartConfig {
    let (x_axis, y_axis) = match ctx.numeric.as_slice() {
        [x, y, ..] => (*x, *y),
        [only] => (*only, *only),
        [] => {
            let first = ctx.column(0).unwrap_or("x");
            (first, ctx.column(1).unwrap_or(first))
        }
    };

    let mut config = ChartConfig::new(ChartKind::Scatter)
        .field(role::X_AXIS, x_axis)
        .field(role::Y_AXIS, y_axis)
        .titled(format!("{} 与 {} 关系", y_axis, x_axis));

    if let Some(color) = ctx.categorical.first() {
        config = config.field(role::COLOR_BY, color);
    }
    config
}

// ── heuristic rule table ─────────────────────────────────────────────

struct ChartRule {
    name: &'static str,
    applies: fn(&ChartContext) -> bool,
    build: fn(&ChartContext) -> ChartConfig,
}

const HEURISTIC_RULES: &[ChartRule] = &[
    ChartRule {
        name: "group_by",
        applies: is_grouped_query,
        build: group_by_bar,
    },
    ChartRule {
        name: "simple_bar",
        applies: is_small_numeric,
        build: simple_bar,
    },
    ChartRule {
        name: "multi_series",
        applies: is_small_multi_numeric,
        build: multi_series_bar,
    },
    ChartRule {
        name: "distribution",
        applies: is_small_categorical,
        build: distribution_pie,
    },
    ChartRule {
        name: "time_series",
        applies: is_time_series,
        build: time_series_line,
    },
];

fn is_grouped_query(ctx: &ChartContext) -> bool {
    ctx.query_lower.contains("group by") || ctx.query_lower.contains("count(")
}

fn group_by_bar(ctx: &ChartContext) -> ChartConfig {
    let x_axis = ctx.category_or_first("category");
    let y_axis = ctx
        .numeric
        .first()
        .copied()
        .or_else(|| ctx.column(1))
        .unwrap_or(x_axis);

    ChartConfig::new(ChartKind::Bar)
        .field(role::X_AXIS, x_axis)
        .field(role::Y_AXIS, y_axis)
        .extra("chart_style", json!("group_by"))
        .titled(format!("{} 按 {} 统计", y_axis, x_axis))
}

fn is_small_numeric(ctx: &ChartContext) -> bool {
    !ctx.numeric.is_empty() && ctx.row_count <= 20
}

fn simple_bar(ctx: &ChartContext) -> ChartConfig {
    let x_axis = ctx.category_or_first("category");
    let y_axis = ctx.numeric.first().copied().unwrap_or(COUNT_FIELD);

    ChartConfig::new(ChartKind::Bar)
        .field(role::X_AXIS, x_axis)
        .field(role::Y_AXIS, y_axis)
        .extra("chart_style", json!("simple_bar"))
        .titled(format!("{} 统计", y_axis))
}

fn is_small_multi_numeric(ctx: &ChartContext) -> bool {
    ctx.numeric.len() >= 2 && ctx.row_count <= 15
}

fn multi_series_bar(ctx: &ChartContext) -> ChartConfig {
    let series: Vec<&str> = ctx.numeric.iter().take(3).copied().collect();
    let mut config = ChartConfig::new(ChartKind::MultiBar)
        .field(role::X_AXIS, ctx.category_or_first("category"))
        .extra("y_axes", json!(series))
        .extra("chart_style", json!("multi_series"))
        .titled("多维度数据对比".to_string());
    if let Some(first) = series.first() {
        config = config.field(role::Y_AXIS, first);
    }
    config
}

fn is_small_categorical(ctx: &ChartContext) -> bool {
    !ctx.categorical.is_empty() && ctx.numeric.is_empty() && ctx.row_count <= 10
}

fn distribution_pie(ctx: &ChartContext) -> ChartConfig {
    let name = ctx.categorical[0];
    let value = ctx.categorical.get(1).copied().unwrap_or(name);

    ChartConfig::new(ChartKind::Pie)
        .field(role::NAME, name)
        .field(role::VALUE, value)
        .extra("chart_style", json!("distribution"))
        .titled(format!("{} 分布", name))
}

fn is_time_series(ctx: &ChartContext) -> bool {
    !ctx.datetime.is_empty() && !ctx.numeric.is_empty()
}

fn time_series_line(ctx: &ChartContext) -> ChartConfig {
    let y_axis = ctx.numeric[0];

    ChartConfig::new(ChartKind::Line)
        .field(role::X_AXIS, ctx.datetime[0])
        .field(role::Y_AXIS, y_axis)
        .extra("smooth", json!(true))
        .extra("chart_style", json!("time_series"))
        .titled(format!("{} 趋势", y_axis))
}

fn heuristic_config(ctx: &ChartContext) -> ChartConfig {
    match HEURISTIC_RULES.iter().find(|rule| (rule.applies)(ctx)) {
        Some(rule) => {
            debug!("Chart heuristic '{}' matched", rule.name);
            (rule.build)(ctx)
        }
        None => {
            debug!("No chart heuristic matched, falling back to table");
            ChartConfig::table()
        }
    }
}

fn requirements_config(ctx: &ChartContext, req: &Requirements) -> ChartConfig {
    match (&req.x_axis, &req.y_axis) {
        (Some(x), Some(_)) => {
            if ctx.profile.kind_of(x) == Some(ColumnKind::Datetime) {
                line_config(ctx, req)
            } else {
                scatter_config(ctx)
            }
        }
        (Some(_), None) | (None, Some(_)) => bar_config(ctx, req),
        (None, None) if req.limit.is_some() && !ctx.categorical.is_empty() => pie_config(ctx, req),
        (None, None) => heuristic_config(ctx),
    }
}

fn with_display_defaults(config: ChartConfig, ctx: &ChartContext) -> ChartConfig {
    config
        .extra("show_title", json!(true))
        .extra("show_legend", json!(ctx.show_legend()))
        .extra("animation", json!(true))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChartRecommender {
    classifier: ColumnClassifier,
    extractor: RequirementExtractor,
}

impl ChartRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a chart for `result`. `query_text` is the SQL that produced it.
    pub fn recommend(&self, result: &ResultSet, instruction: &Instruction, query_text: &str) -> ChartConfig {
        if result.is_empty() {
            return ChartConfig::none();
        }

        let classified = self.classifier.classify(result);
        self.recommend_classified(result, &classified, instruction, query_text)
    }

    /// Same as `recommend` for callers that already classified the columns.
    pub fn recommend_classified(
        &self,
        result: &ResultSet,
        classified: &ClassifiedColumns,
        instruction: &Instruction,
        query_text: &str,
    ) -> ChartConfig {
        if result.is_empty() {
            return ChartConfig::none();
        }

        let ctx = ChartContext::new(&result.columns, &classified.profile, result.row_count(), query_text);
        let req = &instruction.requirements;

        let config = if let Some(chart_type) = instruction.explicit_chart_type {
            let mut config = match chart_type {
                ChartType::Bar => bar_config(&ctx, req),
                ChartType::Line => line_config(&ctx, req),
                ChartType::Pie => pie_config(&ctx, req),
                ChartType::Scatter => scatter_config(&ctx),
                other => {
                    debug!("No dedicated builder for {:?}, using heuristics", other);
                    heuristic_config(&ctx)
                }
            };
            if let Some(title) = &req.title {
                config.title = title.clone();
            }
            config
        } else if !req.is_empty() {
            let mut config = requirements_config(&ctx, req);
            if let Some(title) = &req.title {
                config.title = title.clone();
            }
            config
        } else {
            heuristic_config(&ctx)
        };

        debug!("Recommended {} chart: {}", config.chart_type.as_str(), config.title);
        with_display_defaults(config, &ctx)
    }

    /// Extract the instruction from `user_text` and recommend in one go.
    pub fn analyze(&self, result: &ResultSet, query_text: &str, user_text: &str) -> ChartRecommendation {
        let instruction = self.extractor.extract(user_text);
        let config = self.recommend(result, &instruction, query_text);
        let instruction_followed = !result.is_empty() && instruction.has_instruction();

        ChartRecommendation {
            config,
            instruction_followed,
            instruction,
        }
    }
}

/// Convenience wrapper around `ChartRecommender::recommend`.
pub fn recommend(result: &ResultSet, instruction: &Instruction, query_text: &str) -> ChartConfig {
    ChartRecommender::new().recommend(result, instruction, query_text)
}
