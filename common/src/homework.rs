//! Homework records as returned by the status endpoint, and the fixed
//! table of reviewer verdicts.

use serde::Deserialize;

/// Known review statuses and their human-readable verdicts.
static VERDICTS: &[(&str, &str)] = &[
    ("approved", "Работа проверена: ревьюеру всё понравилось. Ура!"),
    ("reviewing", "Работа взята на проверку ревьюером."),
    ("rejected", "Работа проверена: у ревьюера есть замечания."),
];

/// Look up the verdict for a status. `None` means the status is unknown,
/// which callers treat as an error.
pub fn verdict_for(status: &str) -> Option<&'static str> {
    VERDICTS
        .iter()
        .find(|(known, _)| *known == status)
        .map(|(_, verdict)| *verdict)
}

/// One tracked homework. Both fields must be present and be strings;
/// other fields of the payload are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackedRecord {
    #[serde(rename = "homework_name")]
    pub name: String,
    pub status: String,
}

/// A detected status transition, ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub name: String,
    pub status: String,
    pub verdict: &'static str,
}

impl ChangeEvent {
    pub fn render(&self) -> String {
        format!(
            "Изменился статус проверки работы \"{}\". {}",
            self.name, self.verdict
        )
    }
}

/// Text delivered to the operator when a poll cycle fails.
pub fn render_failure(error: &impl std::fmt::Display) -> String {
    format!("Сбой в работе программы: {}", error)
}
