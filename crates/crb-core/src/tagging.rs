//! Classification codes.
//!
//! A client carries a four-segment dot-delimited code
//! (`type.source.status.priority`). Each segment is a digit string; digits
//! outside the enumerations describe as `?` instead of being rejected.

pub const DEFAULT_CODE: &str = "0.0.0.0";

pub const INVALID_CODE_TEXT: &str = "код некорректен";

const TYPE_LABELS: [&str; 4] = ["неизвестно", "физлицо", "юрлицо", "партнёр"];
const SOURCE_LABELS: [&str; 4] = ["бот", "вручную", "сайт", "реклама"];
const STATUS_LABELS: [&str; 4] = ["новый", "в работе", "оплата", "закрыт"];
const PRIO_LABELS: [&str; 4] = ["обычный", "срочно", "VIP", "черный список"];

/// One of the four code positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeSegment {
    Type,
    Source,
    Status,
    Priority,
}

impl CodeSegment {
    pub fn index(self) -> usize {
        match self {
            CodeSegment::Type => 0,
            CodeSegment::Source => 1,
            CodeSegment::Status => 2,
            CodeSegment::Priority => 3,
        }
    }
}

// Lookup is by exact digit string: "00" is unknown, not 0.
fn label(table: &[&'static str; 4], digit: &str) -> &'static str {
    match digit {
        "0" => table[0],
        "1" => table[1],
        "2" => table[2],
        "3" => table[3],
        _ => "?",
    }
}

/// Human-readable description of a code.
///
/// Anything that does not split into exactly four segments is reported as
/// invalid; unknown digits within a well-formed code degrade per axis.
pub fn describe(code: &str) -> String {
    let parts: Vec<&str> = code.split('.').collect();
    if parts.len() != 4 {
        return INVALID_CODE_TEXT.to_string();
    }

    format!(
        "Тип: {} | Источник: {} | Статус: {} | Приоритет: {}",
        label(&TYPE_LABELS, parts[0]),
        label(&SOURCE_LABELS, parts[1]),
        label(&STATUS_LABELS, parts[2]),
        label(&PRIO_LABELS, parts[3]),
    )
}

/// Replace one segment of `code`, keeping the value verbatim.
///
/// A stored code that does not split into exactly four segments is reset to
/// the default before the segment is applied.
pub fn with_digit(code: &str, segment: CodeSegment, value: &str) -> String {
    let mut parts: Vec<String> = code.split('.').map(str::to_string).collect();
    if parts.len() != 4 {
        parts = vec!["0".to_string(); 4];
    }
    parts[segment.index()] = value.to_string();
    parts.join(".")
}
