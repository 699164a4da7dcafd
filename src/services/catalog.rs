//! Static exam catalog

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

/// An exam and its configured duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub name: String,
    pub duration_ms: i64,
}

impl Exam {
    pub fn new(id: &str, name: &str, minutes: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            duration_ms: minutes * 60 * 1000,
        }
    }
}

/// Read-only lookup of the exams this server knows about
#[derive(Debug, Clone)]
pub struct ExamCatalog {
    exams: Vec<Exam>,
}

impl ExamCatalog {
    pub fn new(exams: Vec<Exam>) -> Self {
        Self { exams }
    }

    /// Load the catalog from a JSON array of `{id, name, durationMs}`
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read exam catalog {}", path.display()))?;
        let exams: Vec<Exam> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse exam catalog {}", path.display()))?;
        info!("Loaded {} exams from {}", exams.len(), path.display());
        Ok(Self::new(exams))
    }

    pub fn all(&self) -> &[Exam] {
        &self.exams
    }

    pub fn get(&self, exam_id: &str) -> Option<&Exam> {
        self.exams.iter().find(|exam| exam.id == exam_id)
    }

    /// Configured duration for an exam, if it is in the catalog
    pub fn duration_of(&self, exam_id: &str) -> Option<i64> {
        self.get(exam_id).map(|exam| exam.duration_ms)
    }
}

impl Default for ExamCatalog {
    fn default() -> Self {
        Self::new(vec![
            Exam::new("exam-1", "OSCE Mock 1", 60),
            Exam::new("exam-2", "Operative Dentistry Quiz", 45),
            Exam::new("exam-3", "Prosthodontics Final", 120),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_lookup() {
        let catalog = ExamCatalog::default();
        assert_eq!(catalog.all().len(), 3);
        assert_eq!(catalog.duration_of("exam-2"), Some(45 * 60 * 1000));
        assert_eq!(catalog.get("exam-3").map(|e| e.name.as_str()), Some("Prosthodontics Final"));
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn loads_catalog_from_json_file() {
        let path = std::env::temp_dir().join(format!("exam-catalog-{}.json", std::process::id()));
        std::fs::write(&path, r#"[{"id":"quiz","name":"Quiz","durationMs":90000}]"#).unwrap();

        let catalog = ExamCatalog::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(catalog.duration_of("quiz"), Some(90_000));
        assert!(catalog.get("exam-1").is_none());
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let err = ExamCatalog::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read exam catalog"));
    }
}
