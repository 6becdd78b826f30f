//! Raw dataset readers and the cleaned-pairs CSV format.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{ConversationPair, DomainError, Result};

/// Reads dialogs (ordered utterances) from a JSON or CSV file.
///
/// JSON is tried first: an array of Persona-Chat style `{"dialog": [{"text"}]}`
/// objects, or objects with a `*chat*` key holding a multi-line string. Anything
/// that does not parse as JSON is read as CSV with a `*chat*` column.
pub fn load_dialogs(path: &Path) -> Result<Vec<Vec<String>>> {
    let raw = std::fs::read_to_string(path).map_err(|e| DomainError::io(path, e))?;

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => {
            debug!(path = %path.display(), "dataset parsed as JSON");
            Ok(dialogs_from_json(value))
        }
        Err(_) => {
            debug!(path = %path.display(), "dataset is not JSON, reading as CSV");
            dialogs_from_csv(raw.as_bytes())
        }
    }
}

fn dialogs_from_json(value: Value) -> Vec<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        _ => {
            warn!("JSON dataset is neither an array nor an object");
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let dialog = dialog_from_json(item);
            if dialog.is_none() {
                warn!(record = i, "skipping malformed record");
            }
            dialog
        })
        .collect()
}

fn dialog_from_json(item: &Value) -> Option<Vec<String>> {
    let obj = item.as_object()?;

    if let Some(dialog) = obj.get("dialog").and_then(Value::as_array) {
        return Some(
            dialog
                .iter()
                .filter_map(|u| u.get("text").and_then(Value::as_str).or_else(|| u.as_str()))
                .map(str::to_string)
                .collect(),
        );
    }

    let (_, chat) = obj.iter().find(|(k, _)| is_chat_column(k))?;
    chat.as_str().map(split_utterances)
}

fn dialogs_from_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| DomainError::dataset(format!("unreadable CSV header: {e}")))?
        .clone();
    let column = headers
        .iter()
        .position(is_chat_column)
        .ok_or_else(|| DomainError::dataset("CSV has no column containing 'chat'"))?;

    let mut dialogs = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = i, error = %e, "skipping malformed CSV row");
                continue;
            }
        };
        match record.get(column).map(str::trim) {
            Some(chat) if !chat.is_empty() => dialogs.push(split_utterances(chat)),
            _ => debug!(row = i, "skipping row without chat"),
        }
    }
    Ok(dialogs)
}

fn is_chat_column(name: &str) -> bool {
    name.to_lowercase().contains("chat")
}

fn split_utterances(chat: &str) -> Vec<String> {
    chat.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn write_pairs_csv(path: &Path, pairs: &[ConversationPair]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DomainError::io(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| DomainError::dataset(format!("{}: {e}", path.display())))?;
    for pair in pairs {
        writer
            .serialize(pair)
            .map_err(|e| DomainError::dataset(e.to_string()))?;
    }
    writer.flush().map_err(|e| DomainError::io(path, e))?;
    Ok(())
}

pub fn read_pairs_csv(path: &Path) -> Result<Vec<ConversationPair>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DomainError::dataset(format!("{}: {e}", path.display())))?;

    let mut pairs = Vec::new();
    for (i, row) in reader.deserialize::<ConversationPair>().enumerate() {
        match row {
            Ok(pair) => pairs.push(pair),
            Err(e) => warn!(row = i, error = %e, "skipping malformed pair"),
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_chat_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data.json");
        std::fs::write(
            &path,
            r#"[
                {"dialog": [{"text": "Hi"}, {"text": "Hello"}, {"id": 3}]},
                "garbage",
                {"chat": "one\n\n two \nthree"}
            ]"#,
        )
        .unwrap();

        let dialogs = load_dialogs(&path).unwrap();
        assert_eq!(
            dialogs,
            vec![
                vec!["Hi".to_string(), "Hello".to_string()],
                vec!["one".to_string(), "two".to_string(), "three".to_string()],
            ]
        );
    }

    #[test]
    fn test_csv_with_chat_column() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("personality.csv");
        std::fs::write(
            &path,
            "Persona,Chat\n\"likes dogs\",\"Hi\nHello\nBye\"\n\"empty\",\"\"\n",
        )
        .unwrap();

        let dialogs = load_dialogs(&path).unwrap();
        assert_eq!(dialogs, vec![vec!["Hi", "Hello", "Bye"]]);
    }

    #[test]
    fn test_csv_without_chat_column_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        assert!(matches!(load_dialogs(&path), Err(DomainError::Dataset(_))));
    }

    #[test]
    fn test_pairs_csv_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processed/cleaned.csv");
        let pairs = vec![
            ConversationPair::new("hi", "hello"),
            ConversationPair::new("hello, there", "bye"),
        ];

        write_pairs_csv(&path, &pairs).unwrap();
        assert_eq!(read_pairs_csv(&path).unwrap(), pairs);
    }
}
