use std::{fmt, str::FromStr};

use crate::{errors::Error, Result};

/// Youngest age the story template supports.
pub const MIN_AGE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(Error::Validation(format!(
                "gender must be male or female, got {other:?}"
            ))),
        }
    }
}

/// The child a story is written for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildProfile {
    pub gender: Gender,
    pub name: String,
    pub age: u32,
    pub situation: String,
}

impl ChildProfile {
    /// Build a profile from raw form values, trimming text fields.
    pub fn parse(gender: &str, name: &str, age: &str, situation: &str) -> Result<Self> {
        let gender = gender.parse::<Gender>()?;
        let age = age
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::Validation(format!("age must be a whole number, got {age:?}")))?;

        let profile = Self {
            gender,
            name: name.trim().to_string(),
            age,
            situation: situation.trim().to_string(),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.age < MIN_AGE {
            return Err(Error::Validation(format!(
                "age must be at least {MIN_AGE}, got {}",
                self.age
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("child's name is required".to_string()));
        }
        if self.situation.trim().is_empty() {
            return Err(Error::Validation("situation is required".to_string()));
        }
        Ok(())
    }
}
