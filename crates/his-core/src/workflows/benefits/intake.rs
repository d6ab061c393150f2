//! Bulk application intake from CSV exports.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::domain::{ApplicationId, Gender, NewApplication};
use super::error::CaseError;
use super::outbox::NoticeDispatcher;
use super::service::BenefitsService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub national_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeSummary {
    pub imported: Vec<ApplicationId>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Deserialize)]
struct IntakeRow {
    full_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    national_id: String,
    gender: String,
    state: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_of_birth: Option<String>,
}

impl IntakeRow {
    fn into_application(self) -> Result<NewApplication, String> {
        let gender = self.gender.parse::<Gender>()?;
        let date_of_birth = self
            .date_of_birth
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|err| format!("invalid date of birth '{raw}': {err}"))
            })
            .transpose()?;

        Ok(NewApplication {
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            national_id: self.national_id,
            gender,
            state: self.state,
            date_of_birth,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Registers every row through the service. Duplicate or malformed rows are reported and
/// skipped; store outages abort the import.
pub struct IntakeImporter<'a, D> {
    service: &'a BenefitsService<D>,
}

impl<'a, D> IntakeImporter<'a, D>
where
    D: NoticeDispatcher + 'static,
{
    pub fn new(service: &'a BenefitsService<D>) -> Self {
        Self { service }
    }

    pub fn import_file(&self, path: &Path) -> Result<IntakeSummary, IntakeImportError> {
        let file = File::open(path).map_err(IntakeImportError::Io)?;
        self.import(file)
    }

    pub fn import<R: Read>(&self, reader: R) -> Result<IntakeSummary, IntakeImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers().map_err(IntakeImportError::Csv)?.clone();
        let national_id_column = headers.iter().position(|header| header == "national_id");
        let mut summary = IntakeSummary::default();

        for record in csv_reader.records() {
            let record = record.map_err(IntakeImportError::Csv)?;
            let line = record.position().map(|position| position.line()).unwrap_or(0);
            let national_id = national_id_column
                .and_then(|column| record.get(column))
                .unwrap_or_default()
                .to_string();

            let application = record
                .deserialize::<IntakeRow>(Some(&headers))
                .map_err(|err| err.to_string())
                .and_then(IntakeRow::into_application);
            let application = match application {
                Ok(application) => application,
                Err(reason) => {
                    summary.rejected.push(RejectedRow {
                        line,
                        national_id,
                        reason,
                    });
                    continue;
                }
            };

            match self.service.register_application(&application) {
                Ok(registered) => summary.imported.push(registered.id),
                Err(err @ (CaseError::StoreUnavailable(_) | CaseError::Storage(_))) => {
                    return Err(IntakeImportError::Store(err));
                }
                Err(err) => {
                    warn!(line, %err, "intake row rejected");
                    summary.rejected.push(RejectedRow {
                        line,
                        national_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            imported = summary.imported.len(),
            rejected = summary.rejected.len(),
            "intake import finished"
        );
        Ok(summary)
    }
}

#[derive(Debug)]
pub enum IntakeImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Store(CaseError),
}

impl fmt::Display for IntakeImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeImportError::Io(err) => write!(f, "failed to read intake file: {err}"),
            IntakeImportError::Csv(err) => write!(f, "failed to parse intake csv: {err}"),
            IntakeImportError::Store(err) => write!(f, "intake aborted: {err}"),
        }
    }
}

impl std::error::Error for IntakeImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IntakeImportError::Io(err) => Some(err),
            IntakeImportError::Csv(err) => Some(err),
            IntakeImportError::Store(err) => Some(err),
        }
    }
}
