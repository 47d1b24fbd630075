use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::answer::{AnswerSet, AnswerValue};
use crate::Error;

/// 응답자별 한 줄 CSV를 읽는다.
///
/// 첫 열은 응답자 식별자, 나머지 머리글은 문항 식별자다. 빈 칸은 무응답이고,
/// `;`가 들어간 칸은 복수 선택으로 나눈다.
pub fn read_bulk<R: Read>(reader: R) -> impl Iterator<Item = Result<(String, AnswerSet), Error>> {
    let mut records = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(reader)
        .into_records();
    std::iter::from_fn(move || {
        let record = records.next()?;
        Some(record.map_err(Error::from).and_then(|record| {
            let headers = records.reader_mut().headers()?;
            parse_row(headers, &record)
        }))
    })
}

fn parse_row(headers: &StringRecord, record: &StringRecord) -> Result<(String, AnswerSet), Error> {
    let line = record.position().map_or(0, |position| position.line());
    let id = match record.get(0) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err(Error::MissingRespondent(line)),
    };
    let answers = headers
        .iter()
        .zip(record.iter())
        .skip(1)
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(question, cell)| (question.to_string(), parse_cell(cell)))
        .collect();
    Ok((id, answers))
}

fn parse_cell(cell: &str) -> AnswerValue {
    if cell.contains(';') {
        AnswerValue::Choices(
            cell.split(';')
                .map(str::trim)
                .filter(|choice| !choice.is_empty())
                .map(str::to_string)
                .collect(),
        )
    } else {
        AnswerValue::from(cell)
    }
}
