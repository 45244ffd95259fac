//! Rule-based SQL synthesis over the `students` table.
//!
//! Used when no AI provider is configured and as the fallback whenever the AI
//! path fails. Rule families are tried in table order; the first one whose
//! trigger matches and whose action produces a statement wins. A family that
//! matches its trigger but cannot produce a statement hands over to the next
//! family. Literal values are interpolated into the text; nothing here is
//! executed.

use crate::record_synth::RecordSynthesizer;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

pub const TABLE: &str = "students";
pub const DEFAULT_SELECT: &str = "SELECT * FROM students LIMIT 10";
pub const LOOKUP_CAP: usize = 20;
pub const DELETE_REFUSAL: &str = "-- 删除操作需要谨慎，请提供具体的删除条件";

const STATS_KEYWORDS: &[&str] = &["统计", "计数", "多少", "人数", "数量", "分布"];
const LOOKUP_KEYWORDS: &[&str] = &["查询", "查看", "显示", "找", "列出"];
const SORT_KEYWORDS: &[&str] = &["排序", "按", "顺序", "排名"];
const INSERT_KEYWORDS: &[&str] = &["新增", "添加", "创建", "插入", "增加"];
const UPDATE_KEYWORDS: &[&str] = &["修改", "更新", "更改", "编辑"];
const DELETE_KEYWORDS: &[&str] = &["删除", "移除", "去掉", "清除"];
const COMPOUND_KEYWORDS: &[&str] = &["并且", "且", "同时", "还", "又要"];
const DESCENDING_WORDS: &[&str] = &["降序", "从大到小"];

/// Keyword → college, in match order.
const COLLEGES: &[(&str, &str)] = &[
    ("计算机学院", "计算机学院"),
    ("计算机", "计算机学院"),
    ("经管学院", "经管学院"),
    ("经管", "经管学院"),
    ("文学院", "文学院"),
    ("理学院", "理学院"),
    ("医学院", "医学院"),
];

const MAJORS: &[(&str, &str)] = &[
    ("软件工程", "软件工程"),
    ("会计学", "会计学"),
    ("计算机科学", "计算机科学"),
    ("人工智能", "人工智能"),
    ("金融学", "金融学"),
    ("临床医学", "临床医学"),
];

/// Includes the colloquial year names.
const GRADES: &[(&str, &str)] = &[
    ("2022级", "2022级"),
    ("2023级", "2023级"),
    ("2024级", "2024级"),
    ("大一", "2024级"),
    ("大二", "2023级"),
    ("大三", "2022级"),
];

const GENDERS: &[(&str, &str)] = &[
    ("男生", "男"),
    ("男同学", "男"),
    ("女生", "女"),
    ("女同学", "女"),
];

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("学号", "student_id"),
    ("姓名", "name"),
    ("成绩", "id"),
    ("分数", "id"),
    ("时间", "created_at"),
    ("创建", "created_at"),
];

/// Only these two colleges are recognized inside compound requests.
const COMPOUND_COLLEGES: &[&str] = &["计算机学院", "经管学院"];

/// Request verbs that the `…学院` pattern may sweep up in front of a name.
const LEADING_FILLER: &[&str] = &["统计", "查看", "查询", "显示", "列出", "各个", "各", "不同"];

/// Words removed before looking for the subject of an update.
const UPDATE_FILLER: &[&str] = &[
    "修改", "更新", "更改", "编辑", "一下", "请", "把", "将", "学生",
];

const DEFAULT_STATS_COLLEGE: &str = "计算机学院";
const DEFAULT_INSERT_NAME: &str = "新学生";
const DEFAULT_PHONE: &str = "13899999999";
const DEFAULT_CLASS: &str = "一班";

lazy_static! {
    static ref CLASS_PATTERN: Regex = Regex::new(r"[一二三四五六七八九十\d]+班").unwrap();
    static ref COLLEGE_PATTERN: Regex = Regex::new(r"\p{Han}+学院").unwrap();
    static ref INSERT_NAME_PATTERN: Regex =
        Regex::new(r"叫(\p{Han}{2,4}?)(?:的|同学|，|,|。|\s|$)").unwrap();
    static ref UPDATE_SUBJECT_PATTERN: Regex =
        Regex::new(r"(\p{Han}{2,4}?)(?:的|同学|电话|手机|班级|，|,|\s|$)").unwrap();
    static ref PHONE_PATTERN: Regex = Regex::new(r"(?:^|\D)(\d{11})(?:\D|$)").unwrap();
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn lookup<'t>(text: &str, table: &'t [(&str, &'t str)]) -> Option<&'t str> {
    table
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, value)| *value)
}

fn strip_leading_filler(mut s: &str) -> &str {
    while let Some(rest) = LEADING_FILLER.iter().find_map(|f| s.strip_prefix(f)) {
        s = rest;
    }
    s
}

/// `column = 'value'` equality condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub column: &'static str,
    pub value: String,
}

impl Condition {
    fn new(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    pub fn to_sql(&self) -> String {
        format!("{} = '{}'", self.column, self.value)
    }
}

fn where_clause(conditions: &[Condition]) -> String {
    conditions.iter().map(Condition::to_sql).join(" AND ")
}

// ── rule families ────────────────────────────────────────────────────

struct SqlRule {
    name: &'static str,
    triggers: fn(&str) -> bool,
    build: fn(&str) -> Option<String>,
}

const RULES: &[SqlRule] = &[
    SqlRule {
        name: "random_insert",
        triggers: is_random_insert,
        build: random_insert,
    },
    SqlRule {
        name: "statistics",
        triggers: |t| contains_any(t, STATS_KEYWORDS),
        build: statistics,
    },
    SqlRule {
        name: "lookup",
        triggers: |t| contains_any(t, LOOKUP_KEYWORDS),
        build: lookup_select,
    },
    SqlRule {
        name: "sort",
        triggers: |t| contains_any(t, SORT_KEYWORDS),
        build: sorted_select,
    },
    SqlRule {
        name: "insert",
        triggers: |t| contains_any(t, INSERT_KEYWORDS) && t.contains("学生"),
        build: insert_student,
    },
    SqlRule {
        name: "update",
        triggers: |t| contains_any(t, UPDATE_KEYWORDS),
        build: update_student,
    },
    SqlRule {
        name: "delete",
        triggers: |t| contains_any(t, DELETE_KEYWORDS),
        build: |_| Some(DELETE_REFUSAL.to_string()),
    },
    SqlRule {
        name: "compound",
        triggers: |t| contains_any(t, COMPOUND_KEYWORDS),
        build: compound_select,
    },
];

fn is_random_insert(text: &str) -> bool {
    text.contains("随机") && text.contains("插入") && text.contains("学生")
}

fn random_insert(_text: &str) -> Option<String> {
    Some(RecordSynthesizer::new().synthesize_insert())
}

fn group_count(column: &str) -> String {
    format!(
        "SELECT {col}, COUNT(*) as 人数 FROM {table} GROUP BY {col} ORDER BY 人数 DESC",
        col = column,
        table = TABLE
    )
}

/// College named in a "majors of college X" request.
fn stats_college(text: &str) -> Option<String> {
    if let Some(college) = lookup(text, COLLEGES) {
        return Some(college.to_string());
    }

    let captured = COLLEGE_PATTERN.find(text)?.as_str();
    let name = strip_leading_filler(captured);
    if name == "学院" {
        // "各学院" style: no particular college named
        None
    } else {
        Some(name.to_string())
    }
}

fn statistics(text: &str) -> Option<String> {
    let sql = if text.contains("专业") && text.contains("学院") {
        match stats_college(text) {
            Some(college) => format!(
                "SELECT major, COUNT(*) as 人数 FROM {} WHERE college = '{}' GROUP BY major ORDER BY 人数 DESC",
                TABLE, college
            ),
            None if COLLEGE_PATTERN.is_match(text) => format!(
                "SELECT college, major, COUNT(*) as 人数 FROM {} GROUP BY college, major ORDER BY 人数 DESC",
                TABLE
            ),
            None => format!(
                "SELECT major, COUNT(*) as 人数 FROM {} WHERE college = '{}' GROUP BY major ORDER BY 人数 DESC",
                TABLE, DEFAULT_STATS_COLLEGE
            ),
        }
    } else if text.contains("学院") {
        group_count("college")
    } else if text.contains("专业") {
        group_count("major")
    } else if text.contains("班级") {
        group_count("class_name")
    } else if text.contains("年级") {
        group_count("grade")
    } else if text.contains("性别") {
        group_count("gender")
    } else {
        format!("SELECT COUNT(*) as 总人数 FROM {}", TABLE)
    };
    Some(sql)
}

/// Equality conditions found in a lookup request, one per lookup table, in
/// college/major/grade/gender/class order.
pub fn lookup_conditions(text: &str) -> Vec<Condition> {
    let major = lookup(text, MAJORS);

    // major names contain college stems ("计算机科学"), so mask them first
    let masked = match major {
        Some(m) => text.replace(m, " "),
        None => text.to_string(),
    };

    let mut conditions = Vec::new();
    if let Some(college) = lookup(&masked, COLLEGES) {
        conditions.push(Condition::new("college", college));
    }
    if let Some(major) = major {
        conditions.push(Condition::new("major", major));
    }
    if let Some(grade) = lookup(text, GRADES) {
        conditions.push(Condition::new("grade", grade));
    }
    if let Some(gender) = lookup(text, GENDERS) {
        conditions.push(Condition::new("gender", gender));
    }
    if let Some(m) = CLASS_PATTERN.find(text) {
        conditions.push(Condition::new("class_name", m.as_str()));
    }
    conditions
}

fn lookup_select(text: &str) -> Option<String> {
    let conditions = lookup_conditions(text);
    let sql = match conditions.as_slice() {
        [] => format!("SELECT * FROM {} LIMIT {}", TABLE, LOOKUP_CAP),
        [single] => format!("SELECT * FROM {} WHERE {}", TABLE, single.to_sql()),
        many => format!(
            "SELECT * FROM {} WHERE {} LIMIT {}",
            TABLE,
            where_clause(many),
            LOOKUP_CAP
        ),
    };
    Some(sql)
}

fn sorted_select(text: &str) -> Option<String> {
    let order = if contains_any(text, DESCENDING_WORDS) {
        "DESC"
    } else {
        "ASC"
    };
    let column = lookup(text, SORT_COLUMNS).unwrap_or("id");
    Some(format!("SELECT * FROM {} ORDER BY {} {}", TABLE, column, order))
}

fn insert_student(text: &str) -> Option<String> {
    if text.contains("随机") {
        return Some(RecordSynthesizer::new().synthesize_insert());
    }

    let name = INSERT_NAME_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_INSERT_NAME);

    let grade = if text.contains("2024") {
        "2024级"
    } else if text.contains("2022") {
        "2022级"
    } else {
        "2023级"
    };

    Some(format!(
        "INSERT INTO {} (name, student_id, class_name, college, major, grade, gender, phone) \
         VALUES ('{}', '2023999', '一班', '计算机学院', '软件工程', '{}', '男', '13800000000')",
        TABLE, name, grade
    ))
}

fn update_subject(text: &str) -> Option<String> {
    let mut rest = text.to_string();
    for filler in UPDATE_FILLER {
        rest = rest.replace(filler, "");
    }
    UPDATE_SUBJECT_PATTERN
        .captures(&rest)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn update_student(text: &str) -> Option<String> {
    let name = update_subject(text)?;

    if text.contains("电话") || text.contains("手机") {
        let phone = PHONE_PATTERN
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(DEFAULT_PHONE);
        return Some(format!(
            "UPDATE {} SET phone = '{}' WHERE name = '{}'",
            TABLE, phone, name
        ));
    }

    if text.contains("班级") {
        let class_name = CLASS_PATTERN
            .find(text)
            .map(|m| m.as_str())
            .unwrap_or(DEFAULT_CLASS);
        return Some(format!(
            "UPDATE {} SET class_name = '{}' WHERE name = '{}'",
            TABLE, class_name, name
        ));
    }

    None
}

// TODO: report the conditions this family could not parse instead of dropping them
fn compound_select(text: &str) -> Option<String> {
    let mut conditions = Vec::new();

    if text.contains("男生") {
        conditions.push(Condition::new("gender", "男"));
    } else if text.contains("女生") {
        conditions.push(Condition::new("gender", "女"));
    }

    if let Some(college) = COMPOUND_COLLEGES.iter().find(|c| text.contains(*c)) {
        conditions.push(Condition::new("college", *college));
    }

    if conditions.is_empty() {
        return None;
    }

    Some(format!(
        "SELECT * FROM {} WHERE {} LIMIT {}",
        TABLE,
        where_clause(&conditions),
        LOOKUP_CAP
    ))
}

/// Statement produced by the builder and the family that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub sql: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedSqlBuilder;

impl RuleBasedSqlBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Never fails; falls back to an unfiltered capped SELECT.
    pub fn build(&self, text: &str) -> String {
        self.build_with_rule(text).sql
    }

    pub fn build_with_rule(&self, text: &str) -> RuleMatch {
        let text = text.trim();
        for rule in RULES {
            if !(rule.triggers)(text) {
                continue;
            }
            match (rule.build)(text) {
                Some(sql) => {
                    debug!("SQL rule '{}' matched: {}", rule.name, sql);
                    return RuleMatch { rule: rule.name, sql };
                }
                None => debug!("SQL rule '{}' triggered but produced nothing", rule.name),
            }
        }

        debug!("No SQL rule matched, using default select");
        RuleMatch {
            rule: "default",
            sql: DEFAULT_SELECT.to_string(),
        }
    }
}

/// Convenience wrapper around `RuleBasedSqlBuilder::build`.
pub fn build(text: &str) -> String {
    RuleBasedSqlBuilder::new().build(text)
}
