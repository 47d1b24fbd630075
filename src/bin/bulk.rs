use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use survivor_survey::{
    persist_report, read_bulk, Error, JsonFileStore, ScoreReport, Scoring, SCORING,
};

#[derive(Parser)]
struct Args {
    path: PathBuf,
    /// 결과를 병합 저장할 JSON 파일
    #[arg(long)]
    store: Option<PathBuf>,
    #[arg(long, env = "SURVEY_SCORING")]
    scoring: Option<PathBuf>,
}

#[derive(Serialize)]
struct Line<'a> {
    id: &'a str,
    result: &'a ScoreReport,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();

    let custom = args.scoring.as_deref().map(Scoring::from_path).transpose()?;
    let scoring = custom.as_ref().unwrap_or(&*SCORING);
    let mut store = args.store.as_deref().map(JsonFileStore::open).transpose()?;

    let reader = BufReader::new(File::open(&args.path)?);
    for row in read_bulk(reader) {
        match row {
            Ok((id, answers)) => {
                let report = scoring.compute(&answers);
                let line = Line {
                    id: &id,
                    result: &report,
                };
                println!("{}", serde_json::to_string(&line)?);
                if let Some(store) = store.as_mut() {
                    persist_report(store, &id, &answers, &report)?;
                }
            }
            Err(e) => {
                log::warn!("Skipping row: {}", e);
            }
        }
    }
    Ok(())
}
