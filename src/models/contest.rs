// src/models/contest.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'contests' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contest {
    pub id: i64,
    pub name: String,
    pub number_of_questions: i32,
    pub description: Option<String>,
    /// One of `ContestStatus`, stored as text.
    pub status: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a contest. Advisory only: grading does not consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContestStatus {
    Registered,
    Scheduled,
    Running,
    Done,
}

impl ContestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestStatus::Registered => "Registered",
            ContestStatus::Scheduled => "Scheduled",
            ContestStatus::Running => "Running",
            ContestStatus::Done => "Done",
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Registered" => Ok(ContestStatus::Registered),
            "Scheduled" => Ok(ContestStatus::Scheduled),
            "Running" => Ok(ContestStatus::Running),
            "Done" => Ok(ContestStatus::Done),
            other => Err(format!("unknown contest status '{}'", other)),
        }
    }
}

/// Represents the 'data_sources' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataSource {
    pub id: i64,
    pub contest_id: i64,
    pub path: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub source_type: String,
    pub description: Option<String>,
}

/// Kinds of reference material a contest can ship with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceType {
    Text,
    Pdf,
    Excel,
    Word,
    Ppt,
    Image,
    Audio,
    Unknown,
}

impl DataSourceType {
    /// Case-insensitive; anything unrecognised becomes `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TEXT" => DataSourceType::Text,
            "PDF" => DataSourceType::Pdf,
            "EXCEL" => DataSourceType::Excel,
            "WORD" => DataSourceType::Word,
            "PPT" => DataSourceType::Ppt,
            "IMAGE" => DataSourceType::Image,
            "AUDIO" => DataSourceType::Audio,
            _ => DataSourceType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceType::Text => "TEXT",
            DataSourceType::Pdf => "PDF",
            DataSourceType::Excel => "EXCEL",
            DataSourceType::Word => "WORD",
            DataSourceType::Ppt => "PPT",
            DataSourceType::Image => "IMAGE",
            DataSourceType::Audio => "AUDIO",
            DataSourceType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DataSourcePayload {
    #[validate(length(min = 1, max = 2000))]
    pub path: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<DataSource> for DataSourcePayload {
    fn from(ds: DataSource) -> Self {
        Self {
            path: ds.path,
            source_type: ds.source_type,
            description: ds.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContestInfo {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// One authored question with its reference answer.
/// An empty `options` list makes it a free-text question.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QueryAnswer {
    #[validate(length(min = 1, max = 5000))]
    pub query: String,
    #[serde(default)]
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 5000))]
    pub answer: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

impl QueryAnswer {
    /// A multiple-choice answer must be one of its options.
    pub fn answer_matches_options(&self) -> bool {
        self.options.is_empty() || self.options.iter().any(|o| o == &self.answer)
    }
}

/// DTO for registering a new contest.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterContestRequest {
    #[validate(nested)]
    pub contest_info: ContestInfo,
    #[serde(default)]
    #[validate(nested)]
    pub data_sources: Vec<DataSourcePayload>,
    #[validate(length(min = 1, message = "A contest needs at least one question."), nested)]
    pub query_answers: Vec<QueryAnswer>,
}

/// DTO returned when a participant downloads a contest.
#[derive(Debug, Serialize)]
pub struct ContestResponse {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub questions: Vec<i64>,
    pub description: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub data_sources: Vec<DataSourcePayload>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
