use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::answer::AnswerSet;
use crate::score::ScoreReport;
use crate::Error;

/// 응답자 식별자로 문서를 읽고 쓰는 저장소
pub trait DocumentStore {
    fn get(&self, key: &str) -> Result<Option<Value>, Error>;

    /// `merge`가 참이면 기존 문서에 깊은 병합하고, 거짓이면 문서 전체를 바꾼다.
    fn set(&mut self, key: &str, doc: Value, merge: bool) -> Result<(), Error>;
}

/// 객체끼리는 필드 단위로 병합하고, 그 외에는 나중 값이 이긴다.
pub fn merge_document(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_document(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn write_document(docs: &mut BTreeMap<String, Value>, key: &str, doc: Value, merge: bool) {
    if merge {
        if let Some(existing) = docs.get_mut(key) {
            merge_document(existing, doc);
            return;
        }
    }
    docs.insert(key.to_string(), doc);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.docs.get(key).cloned())
    }

    fn set(&mut self, key: &str, doc: Value, merge: bool) -> Result<(), Error> {
        write_document(&mut self.docs, key, doc, merge);
        Ok(())
    }
}

/// 응답자 식별자 → 문서 형태의 JSON 파일 하나
///
/// 열 때 전체를 읽고, `set`마다 파일 전체를 다시 쓴다.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    docs: BTreeMap<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let docs = match File::open(path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            docs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.docs)?;
        writer.flush()?;
        log::debug!(
            "Wrote {} documents to {}",
            self.docs.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.docs.get(key).cloned())
    }

    /// 파일 쓰기에 실패하면 메모리의 문서도 되돌린다.
    fn set(&mut self, key: &str, doc: Value, merge: bool) -> Result<(), Error> {
        let previous = self.docs.get(key).cloned();
        write_document(&mut self.docs, key, doc, merge);
        if let Err(e) = self.flush() {
            match previous {
                Some(previous) => self.docs.insert(key.to_string(), previous),
                None => self.docs.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

/// 응답과 채점 결과를 응답자 문서에 병합 저장한다.
pub fn persist_report<S>(
    store: &mut S,
    respondent: &str,
    answers: &AnswerSet,
    report: &ScoreReport,
) -> Result<(), Error>
where
    S: DocumentStore + ?Sized,
{
    let mut doc = Map::new();
    doc.insert("answers".to_string(), serde_json::to_value(answers)?);
    doc.insert("result".to_string(), serde_json::to_value(report)?);
    store.set(respondent, Value::Object(doc), true)?;
    log::info!("Saved result for {respondent}");
    Ok(())
}
