use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::consultation::Consultation;

/// A patient in the in-memory roster. Created when the physician adds a
/// new record; never deleted during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub consultations: Vec<Consultation>,
}

impl Patient {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            date_of_birth: None,
            consultations: Vec::new(),
        }
    }

    pub fn with_date_of_birth(mut self, date: NaiveDate) -> Self {
        self.date_of_birth = Some(date);
        self
    }
}
