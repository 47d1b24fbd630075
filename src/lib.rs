//! 암 환자·생존자 설문 채점 파이프라인
//!
//! 원응답 → 역채점 → 영역별 합계/평균 → 위험군 분류, T점수 → 전체 평균 → 피드백 규칙
//! 순서로 한 응답자의 응답을 처리한다. 모든 단계는 순수 함수이며 같은 입력에 대해
//! 항상 같은 결과를 돌려준다.

mod answer;
mod bulk;
mod feedback;
mod score;
mod store;
mod survey;

pub use answer::{
    question_number, reverse_code, reverse_score, AnswerSet, AnswerValue, LIKERT_MAX, LIKERT_MIN,
};
pub use bulk::read_bulk;
pub use feedback::{
    Condition, CounselingReason, FeedbackEntry, FeedbackRule, FeedbackStyle, RuleContext, RuleSet,
};
pub use score::{
    overall_mean, round_half_up, PopulationStat, RiskGroup, ScoreReport, SectionResult,
    T_SCORE_MEAN, T_SCORE_SCALE,
};
pub use store::{merge_document, persist_report, DocumentStore, JsonFileStore, MemoryStore};
pub use survey::{
    Part, Question, Questionnaire, Scale, Scoring, Section, NO_DATA_MESSAGE, QUESTIONS, SCORING,
};

/// 내장 채점 설정으로 응답 전체를 채점한다.
///
/// 빈 응답을 포함해 어떤 응답에 대해서도 실패하지 않는다.
pub fn compute_all_scores(answers: &AnswerSet) -> ScoreReport {
    SCORING.compute(answers)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 응답 선택지 위반
    #[error("answer must be a listed option")]
    IllegalAnswer,
    /// 응답자 식별자 누락
    #[error("row {0} has no respondent id")]
    MissingRespondent(u64),
    #[error("malformed scoring config: {0}")]
    MalformedScoring(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
