//! Application records and the input used to create them.
//!
//! The serialized shape of [`ApplicationRecord`] is the persisted format:
//! camelCase field names, dates as `YYYY-MM-DD`, and absent optional
//! values written as empty strings so documents stay interchangeable with
//! the browser build of the tracker.
//!
//! Persisted records are trusted: labels this build does not know are
//! kept as [`JobSource::Other`] / [`JobStatus::Other`] and written back
//! unchanged, and elements that are not record-shaped at all travel as
//! raw JSON.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Where a job posting was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobSource {
    LinkedIn,
    Indeed,
    CompanyWebsite,
    Referral,
    /// A label written by another build or by hand, kept verbatim.
    Other(String),
}

impl JobSource {
    /// Every known source, in the order a form would offer them.
    pub const ALL: [JobSource; 4] = [
        JobSource::LinkedIn,
        JobSource::Indeed,
        JobSource::CompanyWebsite,
        JobSource::Referral,
    ];

    /// Label as persisted and displayed.
    pub fn as_str(&self) -> &str {
        match self {
            JobSource::LinkedIn => "LinkedIn",
            JobSource::Indeed => "Indeed",
            JobSource::CompanyWebsite => "Company Website",
            JobSource::Referral => "Referral",
            JobSource::Other(label) => label,
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Never fails: unknown labels become [`JobSource::Other`].
impl FromStr for JobSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(JobSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .unwrap_or_else(|| JobSource::Other(s.to_owned())))
    }
}

/// Pipeline stage of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Rejected,
    /// A label written by another build or by hand, kept verbatim.
    Other(String),
}

impl JobStatus {
    /// Every known status, in pipeline order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interview,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    /// Label as persisted and displayed.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interview => "Interview",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
            JobStatus::Other(label) => label,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Never fails: unknown labels become [`JobStatus::Other`].
impl FromStr for JobStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .unwrap_or_else(|| JobStatus::Other(s.to_owned())))
    }
}

// Both enumerations persist as their plain label.

impl Serialize for JobSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        let Ok(source) = label.parse::<JobSource>();
        Ok(source)
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        let Ok(status) = label.parse::<JobStatus>();
        Ok(status)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One tracked job application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    /// Store-assigned identifier, unique within the collection.
    pub id: String,
    /// Position applied for.
    pub job_title: String,
    /// Employer name.
    pub company_name: String,
    /// Where the posting was found; `None` when not specified.
    #[serde(default, with = "blank_as_none")]
    pub job_source: Option<JobSource>,
    /// Day the application was sent.
    pub application_date: NaiveDate,
    /// Current pipeline stage.
    #[serde(default)]
    pub job_status: JobStatus,
    /// Day a follow-up is planned, if any.
    #[serde(default, with = "blank_as_none")]
    pub follow_up_date: Option<NaiveDate>,
    /// Whether the planned follow-up has happened.
    #[serde(default)]
    pub follow_up_completed: bool,
    /// Free text, usually the pasted posting.
    #[serde(default)]
    pub job_description: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Set once when the store accepts the record. `None` only for
    /// persisted records that were written without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    /// Build a record from validated input.
    pub(crate) fn from_input(
        input: NewApplication,
        application_date: NaiveDate,
        id: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_title: input.job_title,
            company_name: input.company_name,
            job_source: input.job_source,
            application_date,
            job_status: input.job_status,
            follow_up_date: input.follow_up_date,
            follow_up_completed: input.follow_up_completed,
            job_description: input.job_description,
            notes: input.notes,
            created_at: Some(created_at),
        }
    }

    /// Whether a follow-up is scheduled on or before `day` and not yet done.
    pub fn follow_up_due(&self, day: NaiveDate) -> bool {
        !self.follow_up_completed && self.follow_up_date.is_some_and(|date| date <= day)
    }
}

// ---------------------------------------------------------------------------
// Persisted document
// ---------------------------------------------------------------------------

/// One element of the persisted array.
///
/// Untagged: anything that does not read as an [`ApplicationRecord`]
/// (a hand-edited date, a missing id, a bare number) is kept as raw JSON
/// so a flush writes it back instead of dropping it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredElement {
    Record(ApplicationRecord),
    Raw(serde_json::Value),
}

/// Borrowed counterpart of [`StoredElement`] for writing.
#[derive(Serialize)]
#[serde(untagged)]
enum ElementRef<'a> {
    Record(&'a ApplicationRecord),
    Raw(&'a serde_json::Value),
}

/// The full persisted collection as handed to the flusher.
///
/// Readable records come first, in collection order, followed by the raw
/// elements found at load. Raw elements never change after load, so they
/// are shared rather than copied per mutation.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    pub records: Vec<ApplicationRecord>,
    pub raw: Arc<[serde_json::Value]>,
}

impl Snapshot {
    /// Number of array elements this snapshot serializes to.
    pub fn len(&self) -> usize {
        self.records.len() + self.raw.len()
    }
}

impl From<Vec<ApplicationRecord>> for Snapshot {
    fn from(records: Vec<ApplicationRecord>) -> Self {
        Self {
            records,
            raw: Arc::from(Vec::new()),
        }
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let records = self.records.iter().map(ElementRef::Record);
        let raw = self.raw.iter().map(ElementRef::Raw);
        serializer.collect_seq(records.chain(raw))
    }
}

// ---------------------------------------------------------------------------
// Creation input
// ---------------------------------------------------------------------------

/// Field values for a new application, as collected by an add form.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use jobtrack::{JobSource, JobStatus, NewApplication};
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// let input = NewApplication::new("Backend Engineer", "Acme", date)
///     .with_source(JobSource::Referral)
///     .with_status(JobStatus::Interview);
///
/// assert!(input.validate().is_ok());
/// assert_eq!(input.job_source, Some(JobSource::Referral));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewApplication {
    /// Required.
    pub job_title: String,
    /// Required.
    pub company_name: String,
    /// Where the posting was found.
    pub job_source: Option<JobSource>,
    /// Required. `None` models a cleared date input.
    pub application_date: Option<NaiveDate>,
    /// Starting stage, `Applied` unless set.
    pub job_status: JobStatus,
    /// Planned follow-up day.
    pub follow_up_date: Option<NaiveDate>,
    /// Whether the follow-up already happened.
    pub follow_up_completed: bool,
    /// Posting text.
    pub job_description: String,
    /// Free-form notes.
    pub notes: String,
}

impl NewApplication {
    /// Input with the three required fields set and everything else at its
    /// default.
    pub fn new(
        job_title: impl Into<String>,
        company_name: impl Into<String>,
        application_date: NaiveDate,
    ) -> Self {
        Self {
            job_title: job_title.into(),
            company_name: company_name.into(),
            application_date: Some(application_date),
            ..Self::default()
        }
    }

    /// Set where the posting was found.
    pub fn with_source(mut self, source: JobSource) -> Self {
        self.job_source = Some(source);
        self
    }

    /// Start the record at `status` instead of `Applied`.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.job_status = status;
        self
    }

    /// Schedule a follow-up on `date`.
    pub fn with_follow_up(mut self, date: NaiveDate) -> Self {
        self.follow_up_date = Some(date);
        self
    }

    /// Set the job description text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.job_description = description.into();
        self
    }

    /// Set the free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Check the required fields.
    ///
    /// # Returns
    ///
    /// The application date on success, so callers need not unwrap it.
    ///
    /// # Errors
    ///
    /// The first missing field, checked in form order: title, company,
    /// date. Only empty text counts as missing; whitespace is accepted
    /// as entered.
    pub fn validate(&self) -> Result<NaiveDate, ValidationError> {
        if self.job_title.is_empty() {
            return Err(ValidationError::MissingJobTitle);
        }
        if self.company_name.is_empty() {
            return Err(ValidationError::MissingCompanyName);
        }
        self.application_date
            .ok_or(ValidationError::MissingApplicationDate)
    }
}

/// Serde adapter writing `None` as `""` and reading `""` (or `null`) back
/// as `None`.
mod blank_as_none {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
