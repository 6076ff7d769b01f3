//! 答案校验 - 业务能力层

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, BusinessError};
use crate::models::SpeciesRow;

/// 前端提交的卡片（只用到学名和俗名）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerCard {
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
}

impl From<&SpeciesRow> for AnswerCard {
    fn from(row: &SpeciesRow) -> Self {
        Self {
            scientific_name: Some(row.scientific_name.clone()),
            common_name: Some(row.common_name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerVerdict {
    pub correct: bool,
    pub message: String,
}

/// 校验答案（去除首尾空白，不区分大小写）
pub fn check_answer(answer: &str, card: &AnswerCard) -> AppResult<AnswerVerdict> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(BusinessError::EmptyAnswer.into());
    }

    let scientific_name = card
        .scientific_name
        .as_deref()
        .ok_or(BusinessError::InvalidCard)?;

    if answer.to_lowercase() == scientific_name.to_lowercase() {
        let common_name = card.common_name.as_deref().unwrap_or_default();
        Ok(AnswerVerdict {
            correct: true,
            message: format!("Correct! ({})", common_name),
        })
    } else {
        Ok(AnswerVerdict {
            correct: false,
            message: "Incorrect. Try again!".to_string(),
        })
    }
}
