//! Requirement extraction: free text → `Instruction`.
//!
//! Pure keyword and pattern matching. Every hint is extracted independently, so
//! a single request may carry a chart type, axis hints, sorting, a limit and a
//! title at the same time.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Chart types a user can ask for by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    Radar,
    Heatmap,
    Map,
    Gauge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_color_requirement: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        self.x_axis.is_none()
            && self.y_axis.is_none()
            && self.sorted.is_none()
            && self.sort_order.is_none()
            && self.limit.is_none()
            && self.has_color_requirement.is_none()
            && self.title.is_none()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted.unwrap_or(false)
    }
}

/// Structured visualization hints for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub explicit_chart_type: Option<ChartType>,
    /// The label the user wrote, e.g. "折线图", echoed back in confirmations.
    pub explicit_chart_name: Option<String>,
    pub requirements: Requirements,
}

impl Instruction {
    pub fn has_instruction(&self) -> bool {
        self.explicit_chart_type.is_some() || !self.requirements.is_empty()
    }
}

/// Label table in match order. Longer labels precede their prefixes so the
/// recorded name is the most specific one the user wrote.
const CHART_LABELS: &[(&str, ChartType)] = &[
    ("柱状图", ChartType::Bar),
    ("柱状", ChartType::Bar),
    ("条形图", ChartType::Bar),
    ("条形", ChartType::Bar),
    ("折线图", ChartType::Line),
    ("折线", ChartType::Line),
    ("饼图", ChartType::Pie),
    ("饼状图", ChartType::Pie),
    ("散点图", ChartType::Scatter),
    ("散点", ChartType::Scatter),
    ("雷达图", ChartType::Radar),
    ("雷达", ChartType::Radar),
    ("热力图", ChartType::Heatmap),
    ("地图", ChartType::Map),
    ("仪表盘", ChartType::Gauge),
];

const ASCENDING_WORDS: &[&str] = &["升序", "从小到大"];
const DESCENDING_WORDS: &[&str] = &["降序", "从大到小"];

lazy_static! {
    static ref X_AXIS_PATTERNS: Vec<Regex> = axis_patterns("[xX]", "横");
    static ref Y_AXIS_PATTERNS: Vec<Regex> = axis_patterns("[yY]", "纵");
    static ref LIMIT_PATTERN: Regex = Regex::new(r"前(\d+)(?:个|名)").unwrap();
    static ref TITLE_PATTERN: Regex = Regex::new(r"标题[是：:]+([^，。]+)").unwrap();
}

/// Axis phrasings, tried in order. Each pattern stays inside one clause so a
/// hint for one axis cannot swallow the next clause.
fn axis_patterns(axis: &str, axis_cn: &str) -> Vec<Regex> {
    [
        format!(r"以([^为，。,]+)为[^，。,]*{}轴", axis),
        format!(r"用([^做，。,]+)做[^，。,]*{}轴", axis),
        format!(r"{}轴[^，。,]*用([^，。,]+)", axis),
        format!(r"{}轴[^，。,]*是([^，。,]+)", axis_cn),
        format!(r"([^，。,以为]+)为{}轴", axis),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementExtractor;

impl RequirementExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Never fails; text without any hint yields an empty instruction.
    pub fn extract(&self, text: &str) -> Instruction {
        let mut instruction = Instruction::default();

        if let Some((label, chart_type)) = CHART_LABELS.iter().find(|(label, _)| text.contains(label)) {
            instruction.explicit_chart_type = Some(*chart_type);
            instruction.explicit_chart_name = Some(label.to_string());
        }

        let req = &mut instruction.requirements;
        req.x_axis = first_capture(&X_AXIS_PATTERNS, text);
        req.y_axis = first_capture(&Y_AXIS_PATTERNS, text);

        if text.contains("排序") {
            req.sorted = Some(true);
        }
        if ASCENDING_WORDS.iter().any(|w| text.contains(w)) {
            req.sort_order = Some(SortOrder::Asc);
        } else if DESCENDING_WORDS.iter().any(|w| text.contains(w)) {
            req.sort_order = Some(SortOrder::Desc);
        }

        req.limit = LIMIT_PATTERN
            .captures(text)
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .filter(|n| *n > 0);

        if text.contains("颜色") {
            req.has_color_requirement = Some(true);
        }

        req.title = first_capture(std::slice::from_ref(&*TITLE_PATTERN), text);

        instruction
    }
}

/// Convenience wrapper around `RequirementExtractor::extract`.
pub fn extract(text: &str) -> Instruction {
    RequirementExtractor::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hints() {
        let instruction = extract("查询所有学生");
        assert_eq!(instruction.explicit_chart_type, None);
        assert!(instruction.requirements.is_empty());
        assert!(!instruction.has_instruction());
    }

    #[test]
    fn test_chart_label_table_order() {
        let instruction = extract("用折线图展示各年级人数");
        assert_eq!(instruction.explicit_chart_type, Some(ChartType::Line));
        assert_eq!(instruction.explicit_chart_name.as_deref(), Some("折线图"));

        // "饼图" precedes "饼状图" in the table but does not occur here
        let pie = extract("画一个饼状图");
        assert_eq!(pie.explicit_chart_type, Some(ChartType::Pie));
        assert_eq!(pie.explicit_chart_name.as_deref(), Some("饼状图"));

        let bar = extract("条形展示");
        assert_eq!(bar.explicit_chart_name.as_deref(), Some("条形"));
        assert!(bar.has_instruction());
    }

    #[test]
    fn test_axis_hints() {
        let instruction = extract("以班级为x轴，人数为y轴");
        assert_eq!(instruction.requirements.x_axis.as_deref(), Some("班级"));
        assert_eq!(instruction.requirements.y_axis.as_deref(), Some("人数"));

        let uses = extract("X轴用 学院 ，纵轴是人数");
        assert_eq!(uses.requirements.x_axis.as_deref(), Some("学院"));
        assert_eq!(uses.requirements.y_axis.as_deref(), Some("人数"));
    }

    #[test]
    fn test_sort_limit_color_title() {
        let instruction = extract("按人数降序排序，显示前5名，换个颜色，标题是学院人数排行");
        let req = &instruction.requirements;
        assert_eq!(req.sorted, Some(true));
        assert_eq!(req.sort_order, Some(SortOrder::Desc));
        assert_eq!(req.limit, Some(5));
        assert_eq!(req.has_color_requirement, Some(true));
        assert_eq!(req.title.as_deref(), Some("学院人数排行"));
        assert_eq!(instruction.explicit_chart_type, None);
        assert!(instruction.has_instruction());
    }

    #[test]
    fn test_sort_order_without_sort_keyword() {
        let req = extract("从小到大显示").requirements;
        assert_eq!(req.sorted, None);
        assert_eq!(req.sort_order, Some(SortOrder::Asc));
    }

    #[test]
    fn test_zero_limit_ignored() {
        assert_eq!(extract("前0个").requirements.limit, None);
        assert_eq!(extract("前12个专业").requirements.limit, Some(12));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = "用柱状图展示前3个学院，标题：学院分布";
        assert_eq!(extract(text), extract(text));
    }
}
