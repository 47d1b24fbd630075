use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::answer::{reverse_code, AnswerSet};
use crate::feedback::RuleSet;
use crate::score::{PopulationStat, RiskGroup};
use crate::Error;

pub static QUESTIONS: Lazy<Questionnaire> = Lazy::new(|| {
    serde_json::from_str(include_str!("../resources/questions.json"))
        .expect("resources/questions.json is valid")
});

pub static SCORING: Lazy<Scoring> = Lazy::new(|| {
    Scoring::from_json(include_str!("../resources/scoring.json"))
        .expect("resources/scoring.json is valid")
});

/// 전체 평균을 낼 수 없을 때 피드백 대신 보여 주는 문구
pub const NO_DATA_MESSAGE: &str = "응답하지 않은 영역이 있어 점수를 산출할 수 없습니다.";

/// 설문 영역
///
/// `Lifestyle`은 화면 분류에만 쓰이고 채점에서는 제외된다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    /// 신체적 변화
    PhysicalChange,
    /// 건강관리
    HealthManagement,
    /// 사회적 지지
    SocialSupport,
    /// 심리적 부담
    PsychologicalBurden,
    /// 사회적 부담
    SocialBurden,
    /// 회복탄력성
    Resilience,
    /// 생활습관
    Lifestyle,
}

impl Section {
    pub const SCORED: [Section; 6] = [
        Section::PhysicalChange,
        Section::HealthManagement,
        Section::SocialSupport,
        Section::PsychologicalBurden,
        Section::SocialBurden,
        Section::Resilience,
    ];

    pub fn is_scored(self) -> bool {
        self != Section::Lifestyle
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::PhysicalChange => "신체적 변화",
            Section::HealthManagement => "건강관리",
            Section::SocialSupport => "사회적 지지",
            Section::PsychologicalBurden => "심리적 부담",
            Section::SocialBurden => "사회적 부담",
            Section::Resilience => "회복탄력성",
            Section::Lifestyle => "생활습관",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scale {
    pub score: u8,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    /// 복수 선택 문항의 선택지. 비어 있으면 리커트 문항이다.
    #[serde(default)]
    pub options: Vec<String>,
}

impl Question {
    pub fn is_multi_select(&self) -> bool {
        !self.options.is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub category: Section,
    /// 묶음 안내문
    pub title: String,
    pub questions: Vec<Question>,
}

/// 설문 문항 마스터
#[derive(Debug, Deserialize)]
pub struct Questionnaire {
    /// 리커트 문항 공통 척도
    pub scale: Vec<Scale>,
    pub parts: Vec<Part>,
}

impl Questionnaire {
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions().nth(index)
    }

    /// 문항 식별자로 문항을 찾는다.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions().find(|question| question.id == id)
    }

    /// 모든 문항을 화면 순서대로 돌려준다.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.parts.iter().flat_map(|part| part.questions.iter())
    }
}

/// 채점 설정
///
/// 실행 중에는 바뀌지 않는다. 기본값은 `resources/scoring.json`에서 읽는다.
#[derive(Debug, Clone, Deserialize)]
pub struct Scoring {
    /// 역채점 문항 번호
    pub reverse_coded: BTreeSet<u32>,
    /// 영역별 채점 문항
    pub sections: BTreeMap<Section, Vec<String>>,
    /// 영역별 모집단 평균/표준편차
    pub population: BTreeMap<Section, PopulationStat>,
    /// 전체 평균용 모집단 통계
    pub overall: PopulationStat,
    pub overall_comments: BTreeMap<RiskGroup, String>,
    #[serde(default = "default_no_data_message")]
    pub no_data_message: String,
    #[serde(default)]
    pub rules: RuleSet,
}

fn default_no_data_message() -> String {
    NO_DATA_MESSAGE.to_string()
}

impl Scoring {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let scoring: Scoring = serde_json::from_str(json)?;
        scoring.validate()?;
        Ok(scoring)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let scoring: Scoring = serde_json::from_reader(reader)?;
        scoring.validate()?;
        Ok(scoring)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let scoring = Self::from_reader(BufReader::new(File::open(path)?))?;
        log::debug!("Loaded scoring config from {}", path.display());
        Ok(scoring)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for section in Section::SCORED {
            match self.sections.get(&section) {
                Some(questions) if !questions.is_empty() => {}
                _ => {
                    return Err(Error::MalformedScoring(format!(
                        "section {section:?} has no questions"
                    )))
                }
            }
            if !self.population.contains_key(&section) {
                log::warn!("No population stat for {section:?}; it will not be classified");
            }
        }
        if let Some(section) = self
            .sections
            .keys()
            .chain(self.population.keys())
            .find(|section| !section.is_scored())
        {
            return Err(Error::MalformedScoring(format!(
                "{section:?} is not a scored section"
            )));
        }
        let stats = self
            .population
            .iter()
            .map(|(section, stat)| (format!("{section:?}"), stat))
            .chain(std::iter::once(("overall".to_string(), &self.overall)));
        for (name, stat) in stats {
            if !stat.mean.is_finite() || !stat.std.is_finite() || stat.std <= 0.0 {
                return Err(Error::MalformedScoring(format!(
                    "population stat for {name} must have a finite mean and a positive std"
                )));
            }
        }
        for risk in [RiskGroup::LowRisk, RiskGroup::Caution, RiskGroup::HighRisk] {
            if !self.overall_comments.contains_key(&risk) {
                return Err(Error::MalformedScoring(format!(
                    "overall comment for {risk:?} is missing"
                )));
            }
        }
        Ok(())
    }

    /// 영역에 속한 채점 문항
    pub fn questions(&self, section: Section) -> &[String] {
        self.sections
            .get(&section)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn stat(&self, section: Section) -> Option<&PopulationStat> {
        self.population.get(&section)
    }

    pub fn reverse_code(&self, answers: &AnswerSet) -> BTreeMap<String, Option<u8>> {
        reverse_code(answers, &self.reverse_coded)
    }
}
