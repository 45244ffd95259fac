//! Prompts for SQL generation.

use crate::schema::TableSchema;

const GENERATION_RULES: &str = "生成规则：
1. 只返回纯SQL语句，不要任何解释、注释或Markdown标记
2. 使用正确的SQLite语法
3. 如果用户询问统计、数量、人数，请使用COUNT()和GROUP BY
4. 如果用户询问排序，请使用ORDER BY
5. 如果用户询问特定条件，请使用WHERE
6. 如果用户没有明确要求数量限制，默认返回所有数据
7. 列名使用英文，但可以使用AS起中文别名
8. 对于统计查询，请按用户要求的分组字段进行GROUP BY
9. 数值统计按降序排列，其他按需求排列
10. 对于INSERT语句，必须提供完整的VALUES数据
11. 查看学校招生人数变化，就是查看学生年级分布情况

重要：只返回SQL语句，不要其他任何内容！";

/// System prompt embedding the table description and the generation rules.
pub fn sql_system_prompt(schema: &TableSchema) -> String {
    format!(
        "你是一个专业的SQL生成助手。根据用户的问题生成SQLite SQL查询语句。

数据库结构：
表名：{}
字段列表：
{}

示例数据：
{}

{}",
        schema.name,
        schema.format_columns(),
        schema.format_samples(),
        GENERATION_RULES
    )
}

pub fn sql_user_prompt(text: &str) -> String {
    format!("请为以下问题生成SQL查询：{}", text.trim())
}
