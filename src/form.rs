// Absence form validation and submission

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::record::{AbsenceRecord, AbsenceType, NewAbsence};
use crate::storage::KeyValueStorage;
use crate::store::RecordStore;

/// Minimum reason length, in characters
pub const MIN_REASON_CHARS: usize = 5;

/// Classes and students a report may name. An empty list accepts any value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    pub classes: Vec<String>,
    pub students: Vec<String>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            classes: default_classes(),
            students: Vec::new(),
        }
    }
}

/// The six grade classes
pub fn default_classes() -> Vec<String> {
    (1..=6).map(|grade| grade.to_string()).collect()
}

/// Form fields that can fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    StudentName,
    ClassName,
    Reason,
    ProofImage,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::StudentName => "studentName",
            FormField::ClassName => "className",
            FormField::Reason => "reason",
            FormField::ProofImage => "proofImage",
        }
    }
}

/// Per-field validation messages
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", self.joined())]
pub struct ValidationErrors {
    errors: BTreeMap<FormField, String>,
}

impl ValidationErrors {
    fn add(&mut self, field: FormField, message: &str) {
        self.errors.insert(field, message.to_string());
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn joined(&self) -> String {
        self.iter()
            .map(|(field, message)| format!("{}: {}", field.as_str(), message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Errors from submitting a form
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Invalid form: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("Failed to store absence record: {0:#}")]
    Storage(eyre::Report),
}

/// Raw input of the absence form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbsenceForm {
    pub student_name: String,
    pub class_name: String,
    pub absence_type: AbsenceType,
    pub reason: String,
    /// Data-URI image
    pub proof_image: Option<String>,
    /// Day the absence concerns; now when unset
    pub date: Option<DateTime<Utc>>,
}

impl AbsenceForm {
    /// Check every field and build a draft, or report all failing fields at once
    pub fn validate(&self, roster: &Roster) -> Result<NewAbsence, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.student_name.is_empty() || !listed(&roster.students, &self.student_name) {
            errors.add(FormField::StudentName, "Nama siswa harus dipilih dari daftar");
        }

        if self.class_name.is_empty() || !listed(&roster.classes, &self.class_name) {
            errors.add(FormField::ClassName, "Kelas harus dipilih");
        }

        if self.reason.is_empty() {
            errors.add(FormField::Reason, "Alasan ketidakhadiran harus diisi");
        } else if self.reason.chars().count() < MIN_REASON_CHARS {
            errors.add(FormField::Reason, "Alasan terlalu singkat");
        }

        if self
            .proof_image
            .as_deref()
            .is_some_and(|proof| !proof.starts_with("data:image/"))
        {
            errors.add(FormField::ProofImage, "Bukti harus berupa gambar");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewAbsence {
            student_name: self.student_name.clone(),
            class_name: self.class_name.clone(),
            absence_type: self.absence_type,
            reason: self.reason.clone(),
            date: self.date.unwrap_or_else(Utc::now),
            proof_image: self.proof_image.clone(),
        })
    }
}

fn listed(allowed: &[String], value: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a == value)
}

/// Validate the form, wait `delay`, then insert the report into `store`
pub fn submit<'a, S: KeyValueStorage>(
    store: &'a mut RecordStore<AbsenceRecord, S>,
    form: &AbsenceForm,
    roster: &Roster,
    delay: Duration,
) -> Result<&'a AbsenceRecord, SubmitError> {
    let draft = form.validate(roster)?;

    if !delay.is_zero() {
        thread::sleep(delay);
    }

    let records = store.insert(draft).map_err(SubmitError::Storage)?;
    let Some(record) = records.first() else {
        return Err(SubmitError::Storage(eyre::eyre!("Inserted record missing from store")));
    };

    info!(
        id = %record.id,
        student = %record.student_name,
        class = %record.class_name,
        kind = %record.absence_type,
        "New absence received"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn filled() -> AbsenceForm {
        AbsenceForm {
            student_name: "Ahmad Fauzi".to_string(),
            class_name: "2".to_string(),
            absence_type: AbsenceType::Sick,
            reason: "Demam sejak semalam".to_string(),
            proof_image: None,
            date: Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_valid_form_builds_draft() {
        let draft = filled().validate(&Roster::default()).unwrap();
        assert_eq!(draft.student_name, "Ahmad Fauzi");
        assert_eq!(draft.class_name, "2");
        assert_eq!(draft.date, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let errors = AbsenceForm::default().validate(&Roster::default()).unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get(FormField::StudentName), Some("Nama siswa harus dipilih dari daftar"));
        assert_eq!(errors.get(FormField::ClassName), Some("Kelas harus dipilih"));
        assert_eq!(errors.get(FormField::Reason), Some("Alasan ketidakhadiran harus diisi"));
    }

    #[test]
    fn test_reason_too_short() {
        let form = AbsenceForm {
            reason: "flu!".to_string(),
            ..filled()
        };

        let errors = form.validate(&Roster::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(FormField::Reason), Some("Alasan terlalu singkat"));
    }

    #[test]
    fn test_reason_length_counts_characters() {
        let form = AbsenceForm {
            reason: "ééééé".to_string(),
            ..filled()
        };
        assert!(form.validate(&Roster::default()).is_ok());
    }

    #[test]
    fn test_roster_membership() {
        let roster = Roster {
            classes: default_classes(),
            students: vec!["Siti Aminah".to_string()],
        };

        let errors = filled().validate(&roster).unwrap_err();
        assert!(errors.get(FormField::StudentName).is_some());

        let form = AbsenceForm {
            student_name: "Siti Aminah".to_string(),
            class_name: "7".to_string(),
            ..filled()
        };
        let errors = form.validate(&roster).unwrap_err();
        assert_eq!(errors.get(FormField::ClassName), Some("Kelas harus dipilih"));
        assert!(errors.get(FormField::StudentName).is_none());
    }

    #[test]
    fn test_proof_must_be_image_data_uri() {
        let form = AbsenceForm {
            proof_image: Some("https://example.com/photo.jpg".to_string()),
            ..filled()
        };
        let errors = form.validate(&Roster::default()).unwrap_err();
        assert_eq!(errors.get(FormField::ProofImage), Some("Bukti harus berupa gambar"));

        let form = AbsenceForm {
            proof_image: Some("data:image/jpeg;base64,/9j/4AAQ".to_string()),
            ..filled()
        };
        assert!(form.validate(&Roster::default()).is_ok());
    }

    #[test]
    fn test_missing_date_defaults_to_now() {
        let form = AbsenceForm { date: None, ..filled() };
        let before = Utc::now();
        let draft = form.validate(&Roster::default()).unwrap();
        assert!(draft.date >= before);
    }

    #[test]
    fn test_validation_errors_display() {
        let errors = AbsenceForm::default().validate(&Roster::default()).unwrap_err();
        let text = errors.to_string();
        assert!(text.starts_with("studentName: "));
        assert!(text.contains("reason: Alasan ketidakhadiran harus diisi"));
        assert_eq!(text.matches("; ").count(), 2);

        let submit_error = SubmitError::from(errors);
        assert_eq!(submit_error.to_string(), format!("Invalid form: {}", text));
    }

    #[test]
    fn test_submit_inserts_record() {
        let temp = TempDir::new().unwrap();
        let storage = SqliteStorage::open(temp.path().join("absensi.db")).unwrap();
        let mut store = RecordStore::open(storage, "sdn_bangsal_absensi").unwrap();

        let record = submit(&mut store, &filled(), &Roster::default(), Duration::ZERO).unwrap();
        assert_eq!(record.student_name, "Ahmad Fauzi");
        assert_eq!(record.status, None);
        let id = record.id.clone();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load()[0].id, id);
    }

    #[test]
    fn test_submit_invalid_stores_nothing() {
        let temp = TempDir::new().unwrap();
        let storage = SqliteStorage::open(temp.path().join("absensi.db")).unwrap();
        let mut store = RecordStore::open(storage, "sdn_bangsal_absensi").unwrap();
        let form = AbsenceForm {
            reason: "izin".to_string(),
            ..filled()
        };

        let result = submit(&mut store, &form, &Roster::default(), Duration::ZERO);
        assert!(matches!(result, Err(SubmitError::Invalid(_))));
        assert!(store.is_empty());
        assert!(store.load().is_empty());
    }
}
