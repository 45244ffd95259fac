//! User-facing one-line summaries of query and mutation outcomes.

use crate::chart_recommender::ChartRecommendation;
use crate::sql_validator::StatementKind;

/// Summary for a SELECT result and the chart picked for it.
pub fn query_summary(row_count: usize, recommendation: &ChartRecommendation) -> String {
    let mut summary = format!("查询成功！找到 {} 条记录。", row_count);

    if recommendation.instruction_followed {
        let label = recommendation
            .instruction
            .explicit_chart_name
            .as_deref()
            .unwrap_or("图表");
        summary.push_str(&format!(" 已按您的要求生成{}。", label));
    } else if recommendation.config.chart_type.is_chart() {
        summary.push_str(&format!(
            " 智能推荐使用{}展示。",
            recommendation.config.chart_type.display_name()
        ));
    }

    summary
}

/// Summary for INSERT/UPDATE/DELETE. `None` for anything that is not a mutation.
pub fn operation_summary(kind: StatementKind, affected_rows: Option<u64>) -> Option<String> {
    let (done, verb, fallback) = match kind {
        StatementKind::Insert => ("插入成功！", "插入", "记录已添加"),
        StatementKind::Update => ("更新成功！", "更新", "记录已更新"),
        StatementKind::Delete => ("删除成功！", "删除", "记录已删除"),
        StatementKind::Select | StatementKind::Other => return None,
    };

    Some(match affected_rows {
        Some(n) => format!("{}成功{} {} 条记录", done, verb, n),
        None => format!("{}{}", done, fallback),
    })
}
