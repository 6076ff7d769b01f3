//! iNaturalist v1 API 响应结构
//!
//! 只声明用到的字段，其余字段由 serde 忽略。

use serde::{Deserialize, Serialize};

/// `/taxa` 搜索响应
#[derive(Debug, Clone, Deserialize)]
pub struct TaxaResponse {
    #[serde(default)]
    pub results: Vec<Taxon>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Taxon {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
}

/// `/observations/{id}` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationResponse {
    #[serde(default)]
    pub results: Vec<ObservationDetails>,
}

/// 单条观察记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationDetails {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub photos: Vec<ObservationPhoto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationPhoto {
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ObservationDetails {
    /// 第一张照片的署名；没有照片时为 `None`
    pub fn first_photo_attribution(&self) -> Option<Option<&str>> {
        self.photos
            .first()
            .map(|photo| photo.attribution.as_deref())
    }
}
