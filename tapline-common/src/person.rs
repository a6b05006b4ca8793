//! Person directory model
//!
//! Read-only projection of the directory store. The scan engine resolves
//! identifiers against these records but never mutates them; roster
//! maintenance belongs to the external directory loader.

use serde::{Deserialize, Serialize};

/// Person category, determined by which roster matched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    Student,
    Staff,
}

impl std::fmt::Display for PersonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersonType::Student => write!(f, "student"),
            PersonType::Staff => write!(f, "staff"),
        }
    }
}

impl std::str::FromStr for PersonType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "student" => Ok(PersonType::Student),
            "staff" => Ok(PersonType::Staff),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown person type: {}",
                other
            ))),
        }
    }
}

/// Student roster record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub person_id: String,
    pub display_name: String,
    pub site_id: String,
    /// Card number as programmed on the physical card
    pub card_identifier: String,
    /// Institutional ID used as the fallback match field
    pub secondary_id: Option<String>,
    pub classroom_label: Option<String>,
}

/// Staff roster record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRecord {
    pub person_id: String,
    pub display_name: String,
    pub site_id: String,
    pub card_identifier: String,
    pub secondary_id: Option<String>,
    pub role_title: Option<String>,
}

/// A person known to the directory, scoped to one site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Person {
    Student(StudentRecord),
    Staff(StaffRecord),
}

impl Person {
    pub fn person_id(&self) -> &str {
        match self {
            Person::Student(s) => &s.person_id,
            Person::Staff(s) => &s.person_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Person::Student(s) => &s.display_name,
            Person::Staff(s) => &s.display_name,
        }
    }

    pub fn site_id(&self) -> &str {
        match self {
            Person::Student(s) => &s.site_id,
            Person::Staff(s) => &s.site_id,
        }
    }

    pub fn card_identifier(&self) -> &str {
        match self {
            Person::Student(s) => &s.card_identifier,
            Person::Staff(s) => &s.card_identifier,
        }
    }

    pub fn secondary_id(&self) -> Option<&str> {
        match self {
            Person::Student(s) => s.secondary_id.as_deref(),
            Person::Staff(s) => s.secondary_id.as_deref(),
        }
    }

    pub fn person_type(&self) -> PersonType {
        match self {
            Person::Student(_) => PersonType::Student,
            Person::Staff(_) => PersonType::Staff,
        }
    }
}
