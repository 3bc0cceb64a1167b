//! Visitor profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    /// Prefers not to say
    Unspecified,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "unspecified" | "-" => Ok(Gender::Unspecified),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// Profile of a member, keyed by the member's session id.
/// Outlives the membership it was created for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn blank(now: DateTime<Utc>) -> Self {
        Self {
            breed: None,
            age: None,
            gender: None,
            photo_url: None,
            updated_at: now,
        }
    }

    /// Merge a patch over this profile; untouched fields are kept
    pub fn apply(&mut self, patch: ProfilePatch, now: DateTime<Utc>) {
        if let Some(breed) = patch.breed {
            self.breed = Some(breed);
        }
        if let Some(age) = patch.age {
            self.age = Some(age);
        }
        if let Some(gender) = patch.gender {
            self.gender = Some(gender);
        }
        if let Some(photo_url) = patch.photo_url {
            self.photo_url = Some(photo_url);
        }
        self.updated_at = now;
    }

    /// Short summary line, e.g. "Golden • female"
    pub fn summary(&self) -> Option<String> {
        let breed = self.breed.as_deref()?;
        let gender = match self.gender {
            Some(Gender::Male) => "male",
            Some(Gender::Female) => "female",
            Some(Gender::Unspecified) | None => "?",
        };
        Some(format!("{} • {}", breed, gender))
    }
}

/// Partial profile update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub breed: Option<String>,
    pub age: Option<String>,
    pub gender: Option<Gender>,
    pub photo_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.breed.is_none() && self.age.is_none() && self.gender.is_none() && self.photo_url.is_none()
    }
}
