//! Statement builders for bulk mutations

use serde_json::{Map, Value};

use crate::query::literal::{quote, sql_literal};

fn assignments(record: &Map<String, Value>) -> String {
    record
        .iter()
        .map(|(field, value)| format!("{} = {}", field, sql_literal(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `INSERT INTO T SET ...`; `None` for anything but a non-empty object
pub fn insert_statement(type_name: &str, record: &Value) -> Option<String> {
    let record = record.as_object().filter(|r| !r.is_empty())?;
    Some(format!("INSERT INTO {} SET {}", type_name, assignments(record)))
}

/// `UPDATE T SET ... UPSERT WHERE key = literal`; `None` when the record is
/// not an object or lacks `key_field`
pub fn upsert_statement(type_name: &str, record: &Value, key_field: &str) -> Option<String> {
    let record = record.as_object()?;
    let key = record.get(key_field)?;
    Some(format!(
        "UPDATE {} SET {} UPSERT WHERE {} = {}",
        type_name,
        assignments(record),
        key_field,
        sql_literal(key)
    ))
}

/// `DELETE FROM T WHERE condition`; `None` for a blank condition
pub fn delete_statement(type_name: &str, condition: &str) -> Option<String> {
    let condition = condition.trim();
    if condition.is_empty() {
        return None;
    }
    Some(format!("DELETE FROM {} WHERE {}", type_name, condition))
}

/// `DELETE FROM T WHERE @rid IN ['#1:0', ...]`
pub fn delete_by_rids(type_name: &str, rids: &[String]) -> String {
    let list: Vec<String> = rids.iter().map(|rid| quote(rid)).collect();
    format!("DELETE FROM {} WHERE @rid IN [{}]", type_name, list.join(", "))
}

pub fn truncate_statement(type_name: &str) -> String {
    format!("TRUNCATE TYPE {} UNSAFE", type_name)
}
