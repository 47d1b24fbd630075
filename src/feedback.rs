use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::answer::AnswerSet;
use crate::score::RiskGroup;
use crate::survey::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStyle {
    Info,
    Warning,
    Error,
    Success,
}

impl FeedbackStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStyle::Info => "info",
            FeedbackStyle::Warning => "warning",
            FeedbackStyle::Error => "error",
            FeedbackStyle::Success => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub text: String,
    pub style: FeedbackStyle,
}

/// 상담이 필요한 이유 (q12)
///
/// 화면 라벨 `"1) 우울, 불안 등 정서적 어려움"`은 `from_label`에서만 해석하고,
/// 규칙은 이 값끼리만 비교한다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CounselingReason {
    EmotionalDistress,
    FearOfRecurrence,
    FamilyConflict,
    Financial,
    ReturnToWork,
    Other,
}

impl CounselingReason {
    pub const ALL: [CounselingReason; 6] = [
        CounselingReason::EmotionalDistress,
        CounselingReason::FearOfRecurrence,
        CounselingReason::FamilyConflict,
        CounselingReason::Financial,
        CounselingReason::ReturnToWork,
        CounselingReason::Other,
    ];

    pub fn number(self) -> u8 {
        match self {
            CounselingReason::EmotionalDistress => 1,
            CounselingReason::FearOfRecurrence => 2,
            CounselingReason::FamilyConflict => 3,
            CounselingReason::Financial => 4,
            CounselingReason::ReturnToWork => 5,
            CounselingReason::Other => 6,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            CounselingReason::EmotionalDistress => "우울, 불안 등 정서적 어려움",
            CounselingReason::FearOfRecurrence => "재발에 대한 두려움",
            CounselingReason::FamilyConflict => "가족 간 갈등",
            CounselingReason::Financial => "경제적 어려움",
            CounselingReason::ReturnToWork => "직장 복귀 문제",
            CounselingReason::Other => "기타",
        }
    }

    /// 화면에 보이는 번호 붙은 라벨
    pub fn display(self) -> String {
        format!("{}) {}", self.number(), self.text())
    }

    /// `"2) 재발에 대한 두려움"`, `"재발에 대한 두려움"`, `"2"` 모두 같은 이유로 읽는다.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Ok(number) = label.parse::<u8>() {
            return Self::ALL.into_iter().find(|reason| reason.number() == number);
        }
        let text = strip_number_prefix(label);
        Self::ALL.into_iter().find(|reason| reason.text() == text)
    }
}

fn strip_number_prefix(label: &str) -> &str {
    match label.split_once(')') {
        Some((number, rest))
            if !number.trim().is_empty() && number.trim().chars().all(|c| c.is_ascii_digit()) =>
        {
            rest.trim()
        }
        _ => label,
    }
}

/// 규칙 조건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// 복수 선택 문항에 주어진 이유가 하나라도 있다.
    AnyReason {
        question: String,
        reasons: Vec<CounselingReason>,
    },
    SectionRisk {
        section: Section,
        risk: RiskGroup,
    },
    /// 역채점 전 원응답이 `value` 이하. 무응답이면 거짓.
    AtMost { question: String, value: u8 },
    Any(Vec<Condition>),
}

impl Condition {
    pub fn holds(&self, context: &RuleContext) -> bool {
        match self {
            Condition::AnyReason { question, reasons } => context
                .answers
                .get(question)
                .map(|value| {
                    value.choices().into_iter().any(|label| {
                        match CounselingReason::from_label(&label) {
                            Some(reason) => reasons.contains(&reason),
                            None => {
                                log::debug!("Unknown reason {label:?} in {question}");
                                false
                            }
                        }
                    })
                })
                .unwrap_or(false),
            Condition::SectionRisk { section, risk } => {
                context.risks.get(section).copied().flatten() == Some(*risk)
            }
            Condition::AtMost { question, value } => context
                .answers
                .get(question)
                .and_then(|answer| answer.likert())
                .map_or(false, |answer| answer <= *value),
            Condition::Any(conditions) => conditions.iter().any(|c| c.holds(context)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRule {
    pub id: String,
    pub condition: Condition,
    pub comment: String,
    pub style: FeedbackStyle,
}

impl FeedbackRule {
    pub fn fire(&self, context: &RuleContext) -> Option<FeedbackEntry> {
        self.condition.holds(context).then(|| FeedbackEntry {
            text: self.comment.clone(),
            style: self.style,
        })
    }
}

/// 규칙 평가에 쓰는 입력. 응답은 역채점 전 원응답이다.
pub struct RuleContext<'a> {
    pub answers: &'a AnswerSet,
    pub risks: &'a BTreeMap<Section, Option<RiskGroup>>,
}

/// 선언 순서를 유지하는 규칙 목록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<FeedbackRule>);

impl RuleSet {
    pub fn new(rules: Vec<FeedbackRule>) -> Self {
        RuleSet(rules)
    }

    pub fn rules(&self) -> &[FeedbackRule] {
        &self.0
    }

    pub fn get(&self, id: &str) -> Option<&FeedbackRule> {
        self.0.iter().find(|rule| rule.id == id)
    }

    /// 조건을 만족하는 규칙마다 피드백 하나를 선언 순서대로 돌려준다.
    /// 위험도 순으로 정렬하지 않고, 먼저 맞은 규칙에서 멈추지도 않는다.
    pub fn evaluate(&self, context: &RuleContext) -> Vec<FeedbackEntry> {
        self.0
            .iter()
            .filter_map(|rule| {
                let entry = rule.fire(context);
                if entry.is_some() {
                    log::trace!("Feedback rule {} fired", rule.id);
                }
                entry
            })
            .collect()
    }
}
