//! Captured script output.
//!
//! Every log-style call a script makes appends one line to an in-memory
//! buffer, synchronously at the call site, so ordering across awaited
//! capability calls is exactly the order the calls executed in. The buffer
//! is shared between the script thread and the settle path; a timeout
//! snapshot sees whatever had been captured up to that point.

use std::sync::Arc;

use parking_lot::Mutex;
use rhai::Dynamic;

/// Shared, append-only buffer of captured output lines.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line.
    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    /// The captured output so far, newline-joined.
    pub fn snapshot(&self) -> String {
        self.lines.lock().join("\n")
    }
}

/// Serialize one logged value deterministically.
///
/// Strings pass through unchanged; structured values render as
/// pretty-printed JSON; anything unserializable degrades to its display
/// form.
pub fn format_value(value: &Dynamic) -> String {
    if value.is_string() {
        return value.clone().into_string().unwrap_or_default();
    }
    if value.is_unit() {
        return "()".to_string();
    }
    match rhai::serde::from_dynamic::<serde_json::Value>(value) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_order_is_preserved() {
        let buf = OutputBuffer::new();
        buf.push("a");
        buf.push("b");
        buf.push("c");
        assert_eq!(buf.snapshot(), "a\nb\nc");
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(OutputBuffer::new().snapshot(), "");
    }

    #[test]
    fn test_format_string_passes_through() {
        let value = Dynamic::from("hi there");
        assert_eq!(format_value(&value), "hi there");
    }

    #[test]
    fn test_format_int() {
        let value = Dynamic::from(2_i64);
        assert_eq!(format_value(&value), "2");
    }

    #[test]
    fn test_format_map_is_pretty_json() {
        let mut map = rhai::Map::new();
        map.insert("count".into(), Dynamic::from(3_i64));
        let rendered = format_value(&Dynamic::from(map));
        assert!(rendered.contains("\"count\": 3"));
    }
}
