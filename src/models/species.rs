use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 缺失字段的占位值
pub const NOT_AVAILABLE: &str = "N/A";

/// 原始 CSV 行（列名 → 值）
pub type RawRow = HashMap<String, String>;

/// 原始行中的列名，后面的是旧数据文件使用的别名
pub const COL_SCIENTIFIC_NAME: &str = "scientific_name";
pub const COL_COMMON_NAME: &str = "common_name";
pub const COL_IMAGE_URL: &str = "image_url";
pub const COL_REFERENCE_URL: &[&str] = &["reference_url", "taxa_url"];
pub const COL_ATTRIBUTION: &str = "attribution";
pub const COL_OBSERVATION_URL: &[&str] = &["url", "observation_url"];

/// 补全后的物种卡片
///
/// 只包含五个标准字段，原始行中的其他列在补全时丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRow {
    pub scientific_name: String,
    pub common_name: String,
    pub image_url: String,
    #[serde(alias = "taxa_url")]
    pub reference_url: String,
    pub attribution: String,
}

/// CSV 文件中的标准列顺序
pub const SPECIES_COLUMNS: [&str; 5] = [
    "scientific_name",
    "common_name",
    "image_url",
    "reference_url",
    "attribution",
];

impl SpeciesRow {
    /// 以学名创建卡片，其余字段为 "N/A"
    pub fn new(scientific_name: impl Into<String>) -> Self {
        Self {
            scientific_name: scientific_name.into(),
            common_name: NOT_AVAILABLE.to_string(),
            image_url: NOT_AVAILABLE.to_string(),
            reference_url: NOT_AVAILABLE.to_string(),
            attribution: NOT_AVAILABLE.to_string(),
        }
    }

    /// 所有字段都非空
    pub fn is_complete(&self) -> bool {
        [
            &self.scientific_name,
            &self.common_name,
            &self.image_url,
            &self.reference_url,
            &self.attribution,
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }
}

impl std::fmt::Display for SpeciesRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.common_name == NOT_AVAILABLE {
            write!(f, "{}", self.scientific_name)
        } else {
            write!(f, "{} ({})", self.scientific_name, self.common_name)
        }
    }
}

/// 取第一个非空的列值（按别名顺序），返回原始值，不去除空白
pub fn raw_value<'a>(row: &'a RawRow, columns: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .filter_map(|column| row.get(*column))
        .map(String::as_str)
        .find(|value| !value.trim().is_empty())
}

/// 取第一个已有真实值的列值（按别名顺序），跳过 "N/A"
pub fn present_value<'a>(row: &'a RawRow, columns: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .filter_map(|column| row.get(*column))
        .map(String::as_str)
        .find(|value| is_present(Some(*value)))
}

/// 字段已有真实值（非空且不是 "N/A"）
pub fn is_present(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if !v.is_empty() && v != NOT_AVAILABLE)
}
