use std::fs::File;
use std::io::{stdin, BufReader};
use std::path::{Path, PathBuf};

use clap::Parser;
use survivor_survey::{
    persist_report, AnswerSet, AnswerValue, Error, JsonFileStore, Question, ScoreReport, Scoring,
    LIKERT_MAX, LIKERT_MIN, QUESTIONS, SCORING,
};

#[derive(Parser)]
struct Args {
    /// 결과를 저장할 응답자 식별자
    #[arg(long, default_value = "anonymous")]
    respondent: String,
    /// 결과를 병합 저장할 JSON 파일
    #[arg(long)]
    store: Option<PathBuf>,
    /// 내장 설정 대신 사용할 채점 설정 파일
    #[arg(long, env = "SURVEY_SCORING")]
    scoring: Option<PathBuf>,
    /// 직접 입력하는 대신 읽을 응답 JSON 파일
    #[arg(long)]
    answers: Option<PathBuf>,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();

    let custom = args.scoring.as_deref().map(Scoring::from_path).transpose()?;
    let scoring = custom.as_ref().unwrap_or(&*SCORING);

    let answers = match args.answers {
        Some(ref path) => read_answers(path)?,
        None => prompt_answers()?,
    };
    let report = scoring.compute(&answers);
    print_report(&report);

    if let Some(ref path) = args.store {
        let mut store = JsonFileStore::open(path)?;
        persist_report(&mut store, &args.respondent, &answers, &report)?;
    }
    Ok(())
}

fn read_answers(path: &Path) -> Result<AnswerSet, Error> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn prompt_answers() -> Result<AnswerSet, Error> {
    let mut buffer = String::new();
    let mut answers = AnswerSet::new();

    for part in &QUESTIONS.parts {
        println!("[{}] {}", part.category.label(), part.title);
        for question in &part.questions {
            println!("{}", question.text);
            if question.is_multi_select() {
                for option in &question.options {
                    println!("  {}", option);
                }
            } else {
                for score in &QUESTIONS.scale {
                    print!("  {} => {}", score.score, score.text);
                }
                println!();
            }
            loop {
                buffer.clear();
                if stdin().read_line(&mut buffer)? == 0 {
                    return Ok(answers);
                }
                if store_answer(question, buffer.trim(), &mut answers).is_ok() {
                    break;
                }
                if question.is_multi_select() {
                    println!("선택지 번호를 쉼표로 구분해 입력해 주세요. (예: 1,3)");
                } else {
                    println!("응답은 1~5 사이의 숫자로 입력해 주세요. 건너뛰려면 Enter를 누르세요.");
                }
            }
            println!();
        }
    }
    Ok(answers)
}

/// 빈 입력은 무응답으로 남긴다.
fn store_answer(question: &Question, input: &str, answers: &mut AnswerSet) -> Result<(), Error> {
    if input.is_empty() {
        return Ok(());
    }
    let value = if question.is_multi_select() {
        let choices = input
            .split(',')
            .map(|number| {
                let number = number.trim().parse::<usize>().map_err(|_| Error::IllegalAnswer)?;
                number
                    .checked_sub(1)
                    .and_then(|index| question.options.get(index))
                    .cloned()
                    .ok_or(Error::IllegalAnswer)
            })
            .collect::<Result<Vec<String>, Error>>()?;
        AnswerValue::Choices(choices)
    } else {
        let score = input.parse::<u8>().map_err(|_| Error::IllegalAnswer)?;
        if !(LIKERT_MIN..=LIKERT_MAX).contains(&score) {
            return Err(Error::IllegalAnswer);
        }
        AnswerValue::from(score)
    };
    answers.insert(question.id.clone(), value);
    Ok(())
}

fn print_report(report: &ScoreReport) {
    println!("{}", report.table());
    println!();
    println!("{}", report.overall_feedback);
    for entry in &report.additional_feedback {
        println!("[{}] {}", entry.style.as_str(), entry.text);
    }
}
