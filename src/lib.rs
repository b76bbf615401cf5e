// Absensi - Student absence records with local storage, filtered views and xlsx export

pub mod config;
pub mod export;
pub mod filter;
pub mod form;
pub mod locale;
pub mod record;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use export::{ExportError, ExportRow, encode_xlsx, export_rows, file_name, sheet_name, write_export};
pub use filter::{FilterState, ViewCache, compute_view, compute_view_in};
pub use form::{AbsenceForm, FormField, Roster, SubmitError, ValidationErrors, submit};
pub use record::{AbsenceRecord, AbsenceType, ApprovalStatus, NewAbsence, Record, now_ms};
pub use storage::{Backend, FileStorage, KeyValueStorage, SqliteStorage};
pub use store::{AbsenceStore, LoadDiagnostic, RecordStore, open_absence_store};
