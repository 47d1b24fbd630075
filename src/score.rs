use std::collections::BTreeMap;

use comfy_table::Table;
use serde::{Deserialize, Serialize};

use crate::answer::AnswerSet;
use crate::feedback::{FeedbackEntry, RuleContext};
use crate::survey::{Scoring, Section};

pub const T_SCORE_MEAN: f64 = 50.0;
pub const T_SCORE_SCALE: f64 = 16.67;

/// 위험군. 뒤로 갈수록 위험하다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum RiskGroup {
    LowRisk,
    Caution,
    HighRisk,
}

impl RiskGroup {
    pub fn label(self) -> &'static str {
        match self {
            RiskGroup::LowRisk => "저위험집단",
            RiskGroup::Caution => "주의집단",
            RiskGroup::HighRisk => "고위험집단",
        }
    }
}

/// 선행 연구에서 얻은 모집단 평균과 표준편차
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationStat {
    pub mean: f64,
    pub std: f64,
}

impl PopulationStat {
    pub fn cutoff(&self) -> f64 {
        self.mean - self.std
    }

    /// 평균 - 표준편차 이하는 고위험, 평균 이하는 주의, 그 위는 저위험.
    /// 경계값은 모두 더 위험한 쪽으로 분류한다.
    pub fn classify(&self, mean: f64) -> RiskGroup {
        if mean <= self.cutoff() {
            RiskGroup::HighRisk
        } else if mean <= self.mean {
            RiskGroup::Caution
        } else {
            RiskGroup::LowRisk
        }
    }

    /// 평균 50, 표준편차 16.67 척도의 T점수
    pub fn t_score(&self, mean: f64) -> Option<i32> {
        let score = round_half_up((mean - self.mean) / self.std * T_SCORE_SCALE + T_SCORE_MEAN);
        score.is_finite().then_some(score as i32)
    }
}

/// 가장 가까운 정수로 반올림하되 .5는 항상 +∞ 쪽으로 올린다. (-2.5 → -2)
///
/// 화면 쪽 `Math.round`와 같은 값을 내야 한다. `f64::round`는 음수 .5를 0에서 먼 쪽으로 보내므로
/// 그 경우만 한 칸 올린다. `floor(x + 0.5)`는 0.49999999999999994에서 1이 되어 쓰지 않는다.
pub fn round_half_up(value: f64) -> f64 {
    let rounded = value.round();
    if value - rounded == 0.5 {
        rounded + 1.0
    } else {
        rounded
    }
}

/// 한 영역의 채점 결과
///
/// 응답이 하나도 없으면 `mean`은 0이 아니라 `None`이고, 표준점수와 위험군도 `None`이다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub raw_sum: u32,
    pub mean: Option<f64>,
    pub std_score: Option<i32>,
    pub risk_group: Option<RiskGroup>,
}

impl SectionResult {
    /// 유효한 응답만 더하고 평균을 낸다. 무응답은 개수에도 넣지 않는다.
    pub fn aggregate<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<u8>>,
    {
        let (raw_sum, count) = values
            .into_iter()
            .flatten()
            .fold((0u32, 0u32), |(sum, count), value| {
                (sum + u32::from(value), count + 1)
            });
        SectionResult {
            raw_sum,
            mean: (count > 0).then(|| f64::from(raw_sum) / f64::from(count)),
            std_score: None,
            risk_group: None,
        }
    }
}

/// 계산 가능한 영역 평균들의 단순 평균
///
/// 영역별 문항 수와 관계없이 모든 영역을 같은 비중으로 본다.
pub fn overall_mean<I>(means: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = means
        .into_iter()
        .flatten()
        .filter(|mean| mean.is_finite())
        .fold((0.0, 0u32), |(sum, count), mean| (sum + mean, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// 화면과 저장소에 넘기는 채점 결과 묶음
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub raw_scores: BTreeMap<Section, u32>,
    pub mean_scores: BTreeMap<Section, Option<f64>>,
    pub std_scores: BTreeMap<Section, Option<i32>>,
    pub risk_groups: BTreeMap<Section, Option<RiskGroup>>,
    pub overall_mean: Option<f64>,
    pub overall_risk_group: Option<RiskGroup>,
    pub overall_feedback: String,
    pub additional_feedback: Vec<FeedbackEntry>,
}

impl ScoreReport {
    pub fn section(&self, section: Section) -> Option<SectionResult> {
        Some(SectionResult {
            raw_sum: *self.raw_scores.get(&section)?,
            mean: self.mean_scores.get(&section).copied().flatten(),
            std_score: self.std_scores.get(&section).copied().flatten(),
            risk_group: self.risk_groups.get(&section).copied().flatten(),
        })
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["영역", "원점수", "평균", "T점수", "위험군"]);
        for (&section, &raw_sum) in &self.raw_scores {
            let result = self.section(section);
            let mean = result.and_then(|r| r.mean);
            let std_score = result.and_then(|r| r.std_score);
            let risk_group = result.and_then(|r| r.risk_group);
            table.add_row(vec![
                section.label().to_string(),
                raw_sum.to_string(),
                mean.map_or_else(|| "-".to_string(), |mean| format!("{mean:.2}")),
                std_score.map_or_else(|| "-".to_string(), |score| score.to_string()),
                risk_group.map_or("-", RiskGroup::label).to_string(),
            ]);
        }
        table.add_row(vec![
            "전체".to_string(),
            "-".to_string(),
            self.overall_mean
                .map_or_else(|| "-".to_string(), |mean| format!("{mean:.2}")),
            "-".to_string(),
            self.overall_risk_group
                .map_or("-", RiskGroup::label)
                .to_string(),
        ]);
        table
    }
}

impl Scoring {
    /// 평균이 없거나 모집단 통계가 없는 영역은 분류하지 않는다.
    pub fn risk_group(&self, section: Section, mean: Option<f64>) -> Option<RiskGroup> {
        let mean = mean.filter(|mean| mean.is_finite())?;
        Some(self.stat(section)?.classify(mean))
    }

    pub fn std_score(&self, section: Section, mean: Option<f64>) -> Option<i32> {
        let mean = mean.filter(|mean| mean.is_finite())?;
        self.stat(section)?.t_score(mean)
    }

    pub fn overall_risk_group(&self, mean: Option<f64>) -> Option<RiskGroup> {
        let mean = mean.filter(|mean| mean.is_finite())?;
        Some(self.overall.classify(mean))
    }

    pub fn overall_feedback(&self, risk: Option<RiskGroup>) -> String {
        risk.and_then(|risk| self.overall_comments.get(&risk))
            .unwrap_or(&self.no_data_message)
            .clone()
    }

    pub fn section_result(
        &self,
        section: Section,
        coded: &BTreeMap<String, Option<u8>>,
    ) -> SectionResult {
        let values = self
            .questions(section)
            .iter()
            .map(|id| coded.get(id).copied().flatten());
        let result = SectionResult::aggregate(values);
        SectionResult {
            std_score: self.std_score(section, result.mean),
            risk_group: self.risk_group(section, result.mean),
            ..result
        }
    }

    /// 응답 하나를 끝까지 채점한다.
    pub fn compute(&self, answers: &AnswerSet) -> ScoreReport {
        let coded = self.reverse_code(answers);
        let results: BTreeMap<Section, SectionResult> = Section::SCORED
            .into_iter()
            .map(|section| (section, self.section_result(section, &coded)))
            .collect();

        let means: BTreeMap<Section, Option<f64>> = results
            .iter()
            .map(|(&section, result)| (section, result.mean))
            .collect();
        let risks: BTreeMap<Section, Option<RiskGroup>> = results
            .iter()
            .map(|(&section, result)| (section, result.risk_group))
            .collect();

        let overall_mean = overall_mean(means.values().copied());
        let overall_risk_group = self.overall_risk_group(overall_mean);
        let additional_feedback = self.rules.evaluate(&RuleContext {
            answers,
            risks: &risks,
        });

        let report = ScoreReport {
            raw_scores: results
                .iter()
                .map(|(&section, result)| (section, result.raw_sum))
                .collect(),
            std_scores: results
                .iter()
                .map(|(&section, result)| (section, result.std_score))
                .collect(),
            mean_scores: means,
            risk_groups: risks,
            overall_mean,
            overall_risk_group,
            overall_feedback: self.overall_feedback(overall_risk_group),
            additional_feedback,
        };
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("section scores\n{}", report.table());
        }
        report
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::survey::{NO_DATA_MESSAGE, SCORING};
    use crate::AnswerValue;
    use pretty_assertions::assert_eq;

    fn stat() -> PopulationStat {
        PopulationStat {
            mean: 3.5,
            std: 0.5,
        }
    }

    #[test]
    fn test_classify_bands() {
        let stat = stat();
        assert_eq!(stat.classify(1.0), RiskGroup::HighRisk);
        assert_eq!(stat.classify(3.2), RiskGroup::Caution);
        assert_eq!(stat.classify(4.0), RiskGroup::LowRisk);
    }

    #[test]
    fn test_classify_boundaries_are_inclusive() {
        let stat = stat();
        assert_eq!(stat.classify(stat.cutoff()), RiskGroup::HighRisk);
        assert_eq!(stat.classify(stat.mean), RiskGroup::Caution);
        assert_eq!(stat.classify(stat.mean + 1e-9), RiskGroup::LowRisk);
    }

    #[test]
    fn test_t_score() {
        let stat = stat();
        assert_eq!(stat.t_score(3.5), Some(50));
        assert_eq!(stat.t_score(4.0), Some(67));
        assert_eq!(stat.t_score(3.0), Some(33));
        assert_eq!(stat.t_score(1.0), Some(-33));
    }

    #[test]
    fn test_t_score_zero_std() {
        let stat = PopulationStat {
            mean: 3.0,
            std: 0.0,
        };
        assert_eq!(stat.t_score(4.0), None);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(2.4), 2.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(-0.5), 0.0);
        assert_eq!(round_half_up(1.5), 2.0);
        assert_eq!(round_half_up(-1.5), -1.0);
    }

    #[test]
    fn test_round_half_up_just_below_half() {
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
        assert_eq!(round_half_up(-0.49999999999999994), 0.0);
        assert!(round_half_up(f64::NAN).is_nan());
    }

    #[test]
    fn test_aggregate() {
        let result = SectionResult::aggregate(vec![Some(2), None, Some(4), Some(3)]);
        assert_eq!(result.raw_sum, 9);
        assert_eq!(result.mean, Some(3.0));
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        let result = SectionResult::aggregate(vec![None, None]);
        assert_eq!(result.raw_sum, 0);
        assert_eq!(result.mean, None);
        assert_eq!(result.std_score, None);
        assert_eq!(result.risk_group, None);
    }

    #[test]
    fn test_overall_mean_is_unweighted() {
        // 8문항 영역 평균 1.0과 3문항 영역 평균 5.0을 같은 비중으로 본다.
        assert_eq!(overall_mean(vec![Some(1.0), Some(5.0), None]), Some(3.0));
        assert_eq!(overall_mean(vec![None, None]), None);
        assert_eq!(overall_mean(vec![Some(f64::NAN), Some(2.0)]), Some(2.0));
    }

    #[test]
    fn test_missing_stat_is_not_classified() {
        let mut scoring = SCORING.clone();
        scoring.population.remove(&Section::Resilience);
        assert_eq!(scoring.risk_group(Section::Resilience, Some(1.0)), None);
        assert_eq!(scoring.std_score(Section::Resilience, Some(1.0)), None);
        assert_eq!(
            scoring.risk_group(Section::SocialSupport, Some(1.0)),
            Some(RiskGroup::HighRisk)
        );
        assert_eq!(scoring.risk_group(Section::SocialSupport, None), None);
        assert_eq!(scoring.risk_group(Section::SocialSupport, Some(f64::NAN)), None);
    }

    #[test]
    fn test_section_result_reverse_codes() {
        let answers: AnswerSet = SCORING
            .questions(Section::PhysicalChange)
            .iter()
            .map(|id| (id.clone(), AnswerValue::from(1)))
            .collect();
        let report = SCORING.compute(&answers);
        let result = report.section(Section::PhysicalChange).unwrap();
        assert_eq!(result.raw_sum, 40);
        assert_eq!(result.mean, Some(5.0));
        assert_eq!(result.risk_group, Some(RiskGroup::LowRisk));
    }

    #[test]
    fn test_overall_feedback() {
        assert_eq!(SCORING.overall_feedback(None), NO_DATA_MESSAGE);
        assert_eq!(
            SCORING.overall_feedback(Some(RiskGroup::Caution)),
            SCORING.overall_comments[&RiskGroup::Caution]
        );
    }

    #[test]
    fn test_table_marks_missing() {
        let report = SCORING.compute(&AnswerSet::new());
        let rendered = report.table().to_string();
        assert!(rendered.contains("회복탄력성"));
        assert!(rendered.contains("-"));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = SCORING.compute(&AnswerSet::new());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["meanScores"]["physicalChange"].is_null());
        assert_eq!(json["rawScores"]["resilience"], 0);
        assert!(json["overallRiskGroup"].is_null());
        assert_eq!(json["overallFeedback"], NO_DATA_MESSAGE);
    }
}
