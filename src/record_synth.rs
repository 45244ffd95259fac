//! Randomized two-row INSERT for the `students` table.
//!
//! Used whenever an insert-like request cannot be turned into a complete
//! statement any other way. The output shape is fixed; only the values vary.

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

const SURNAMES: &[&str] = &[
    "张", "王", "李", "赵", "刘", "陈", "杨", "黄", "周", "吴", "郑", "孙", "钱", "冯", "程",
];
const GIVEN_NAMES: &[&str] = &[
    "伟", "芳", "娜", "秀英", "敏", "静", "磊", "强", "洋", "艳", "明", "华", "军", "杰", "婷",
];
const CLASSES: &[&str] = &["一班", "二班", "三班", "四班", "五班"];
const COLLEGES: &[&str] = &[
    "计算机学院", "经管学院", "文学院", "理学院", "医学院", "法学院", "艺术学院",
];
const MAJORS: &[&str] = &[
    "软件工程", "人工智能", "数据科学", "计算机科学", "物联网工程",
    "会计学", "金融学", "临床医学", "法学", "汉语言文学",
];
const GENDERS: &[&str] = &["男", "女"];

pub const COHORT: &str = "2024级";
const STUDENT_ID_PREFIX: &str = "2024";

/// One synthesized `students` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub name: String,
    pub student_id: String,
    pub class_name: String,
    pub college: String,
    pub major: String,
    pub grade: String,
    pub gender: String,
    pub phone: String,
}

impl StudentRecord {
    fn values_tuple(&self) -> String {
        format!(
            "('{}', '{}', '{}', '{}', '{}', '{}', '{}', '{}')",
            self.name,
            self.student_id,
            self.class_name,
            self.college,
            self.major,
            self.grade,
            self.gender,
            self.phone
        )
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{}{}", pick(rng, SURNAMES), pick(rng, GIVEN_NAMES))
}

fn random_record<R: Rng + ?Sized>(
    rng: &mut R,
    name: String,
    student_id: String,
    phone_prefix: &str,
) -> StudentRecord {
    StudentRecord {
        name,
        student_id,
        class_name: pick(rng, CLASSES).to_string(),
        college: pick(rng, COLLEGES).to_string(),
        major: pick(rng, MAJORS).to_string(),
        grade: COHORT.to_string(),
        gender: pick(rng, GENDERS).to_string(),
        phone: format!(
            "{}{:04}{:04}",
            phone_prefix,
            rng.gen_range(1000..=9999),
            rng.gen_range(1000..=9999)
        ),
    }
}

/// Seconds-based id base so ids from consecutive runs rarely collide.
fn id_base() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() % 10_000)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordSynthesizer;

impl RecordSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Two rows with distinct names and distinct student ids.
    pub fn synthesize_records<R: Rng + ?Sized>(&self, rng: &mut R) -> [StudentRecord; 2] {
        let base = id_base();
        let first_id = format!("{}{:04}", STUDENT_ID_PREFIX, base + rng.gen_range(1..=50));
        let second_id = format!("{}{:04}", STUDENT_ID_PREFIX, base + rng.gen_range(51..=100));

        let first_name = random_name(rng);
        let mut second_name = random_name(rng);
        while second_name == first_name {
            second_name = random_name(rng);
        }

        [
            random_record(rng, first_name, first_id, "138"),
            random_record(rng, second_name, second_id, "139"),
        ]
    }

    pub fn synthesize_insert_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let [first, second] = self.synthesize_records(rng);
        format!(
            "INSERT INTO students (name, student_id, class_name, college, major, grade, gender, phone) VALUES\n{},\n{}",
            first.values_tuple(),
            second.values_tuple()
        )
    }

    /// Always returns a complete two-row INSERT statement.
    pub fn synthesize_insert(&self) -> String {
        let sql = self.synthesize_insert_with(&mut rand::thread_rng());
        info!("Synthesized random two-row INSERT");
        sql
    }
}

/// Convenience wrapper around `RecordSynthesizer::synthesize_insert`.
pub fn synthesize_insert() -> String {
    RecordSynthesizer::new().synthesize_insert()
}
