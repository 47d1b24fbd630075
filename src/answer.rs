use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const LIKERT_MIN: u8 = 1;
pub const LIKERT_MAX: u8 = 5;

/// 문항 식별자(`q<번호>` 또는 `q<번호>_<하위번호>`) → 응답
pub type AnswerSet = BTreeMap<String, AnswerValue>;

/// 화면에서 넘어온 응답 값
///
/// 리커트 응답은 숫자 또는 숫자 문자열로, 복수 선택은 선택지 라벨 목록으로 들어온다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
    Choices(Vec<String>),
}

impl AnswerValue {
    /// 1〜5 사이의 정수로 해석되는 경우에만 리커트 값을 돌려준다.
    /// 빈 문자열, 숫자가 아닌 값, 범위 밖의 값은 무응답으로 취급한다. 0으로 바꾸지 않는다.
    pub fn likert(&self) -> Option<u8> {
        let value = match self {
            AnswerValue::Number(value) => *value,
            AnswerValue::Text(text) => text.trim().parse::<f64>().ok()?,
            AnswerValue::Choices(_) => return None,
        };
        let range = f64::from(LIKERT_MIN)..=f64::from(LIKERT_MAX);
        if value.fract() == 0.0 && range.contains(&value) {
            Some(value as u8)
        } else {
            None
        }
    }

    /// 복수 선택 응답의 라벨. 단일 문자열은 선택지 하나로 본다.
    /// 정수 하나(`{"q12": 2}`)는 CSV의 `"2"`와 같게 선택지 번호 하나로 읽는다.
    pub fn choices(&self) -> Vec<Cow<'_, str>> {
        match self {
            AnswerValue::Choices(choices) => choices.iter().map(|c| Cow::from(c.as_str())).collect(),
            AnswerValue::Text(text) if !text.trim().is_empty() => vec![Cow::from(text.trim())],
            AnswerValue::Number(number) if number.fract() == 0.0 && *number >= 0.0 => {
                vec![Cow::from(number.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

impl From<u8> for AnswerValue {
    fn from(value: u8) -> Self {
        AnswerValue::Number(f64::from(value))
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::Choices(value)
    }
}

/// `q13_1_1` → 13
pub fn question_number(id: &str) -> Option<u32> {
    id.strip_prefix('q')?.split('_').next()?.parse().ok()
}

/// 1⇒5, 2⇒4, 3⇒3, 4⇒2, 5⇒1. 척도 밖의 값은 `None`.
pub fn reverse_score(value: u8) -> Option<u8> {
    if (LIKERT_MIN..=LIKERT_MAX).contains(&value) {
        Some(LIKERT_MAX + LIKERT_MIN - value)
    } else {
        None
    }
}

fn reverse_if(reverse_coded: &BTreeSet<u32>, id: &str, value: u8) -> Option<u8> {
    match question_number(id) {
        Some(ref number) if reverse_coded.contains(number) => reverse_score(value),
        _ => Some(value),
    }
}

/// 부정 문항을 역채점해 점수가 높을수록 좋은 상태가 되도록 맞춘다.
///
/// 키는 그대로 유지하고, 무응답은 `None`으로 남겨 이후 단계에서 걸러낸다.
pub fn reverse_code(
    answers: &AnswerSet,
    reverse_coded: &BTreeSet<u32>,
) -> BTreeMap<String, Option<u8>> {
    answers
        .iter()
        .map(|(id, value)| {
            let coded = value
                .likert()
                .and_then(|value| reverse_if(reverse_coded, id, value));
            (id.clone(), coded)
        })
        .collect()
}
