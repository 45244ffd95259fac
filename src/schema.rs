//! Description of the `students` table handed to the SQL model.

use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
    /// Sample rows, values aligned with the non-generated columns.
    pub sample_rows: Vec<Vec<&'static str>>,
}

const fn column(
    name: &'static str,
    sql_type: &'static str,
    description: &'static str,
) -> ColumnSpec {
    ColumnSpec {
        name,
        sql_type,
        description,
    }
}

/// Columns filled by callers; `id` and `created_at` are generated.
pub const SAMPLE_COLUMNS: &[&str] = &[
    "name", "student_id", "class_name", "college", "major", "grade", "gender", "phone",
];

impl TableSchema {
    pub fn students() -> Self {
        Self {
            name: "students",
            columns: vec![
                column("id", "INTEGER", "主键，自增"),
                column("name", "TEXT", "学生姓名"),
                column("student_id", "TEXT", "学号，唯一"),
                column("class_name", "TEXT", "班级，如 一班、二班"),
                column("college", "TEXT", "学院，如 计算机学院、经管学院"),
                column("major", "TEXT", "专业，如 软件工程、会计学"),
                column("grade", "TEXT", "年级，如 2022级、2023级、2024级"),
                column("gender", "TEXT", "性别，男 或 女"),
                column("phone", "TEXT", "手机号码"),
                column("created_at", "TIMESTAMP", "创建时间，默认当前时间"),
            ],
            sample_rows: vec![
                vec!["张三", "2023001", "一班", "计算机学院", "软件工程", "2023级", "男", "13800138001"],
                vec!["李四", "2023002", "二班", "经管学院", "会计学", "2023级", "女", "13800138002"],
                vec!["赵六", "2022004", "三班", "计算机学院", "计算机科学", "2022级", "女", "13800138004"],
            ],
        }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// One `- name (TYPE): description` line per column.
    pub fn format_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("- {} ({}): {}", c.name, c.sql_type, c.description))
            .join("\n")
    }

    pub fn format_samples(&self) -> String {
        self.sample_rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let fields = SAMPLE_COLUMNS
                    .iter()
                    .zip(row)
                    .map(|(col, value)| format!("{}={}", col, value))
                    .join(", ");
                format!("- 示例{}: {}", i + 1, fields)
            })
            .join("\n")
    }
}
