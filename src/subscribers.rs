use crate::logw;
use std::path::Path;
use tokio::fs;

/// Numeric chat ids from a JSON array file. A missing or malformed file means no subscribers.
pub async fn load_subscribers(path: &Path) -> Vec<i64> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match parse_subscribers(&raw) {
        Some(ids) => ids,
        None => {
            logw(format!("Ignoring malformed subscribers file: {}", path.display()));
            Vec::new()
        }
    }
}

/// Accepts numbers and numeric strings; any other entry rejects the whole list.
fn parse_subscribers(raw: &str) -> Option<Vec<i64>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw).ok()?;
    values
        .iter()
        .map(|v| match v {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}
