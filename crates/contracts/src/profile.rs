//! User physical profile, read from the preferences store.

use serde::{Deserialize, Serialize};

use crate::ActivityType;

/// Self-reported gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[serde(alias = "Male")]
    Male,
    #[serde(alias = "Female")]
    Female,
    #[serde(alias = "Non-binary", alias = "non-binary")]
    NonBinary,
    #[default]
    #[serde(alias = "Other")]
    Other,
}

/// Physical stats used to derive distance and calories.
///
/// Read-only input. A profile with any zero field is incomplete: step counting
/// still works but derived metrics come out as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPhysicalProfile {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age_years: u32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub activity: ActivityType,
}

impl Default for UserPhysicalProfile {
    fn default() -> Self {
        Self {
            weight_kg: 0.0,
            height_cm: 0.0,
            age_years: 0,
            gender: Gender::Other,
            activity: ActivityType::BriskWalking,
        }
    }
}

impl UserPhysicalProfile {
    /// All required fields are present and positive
    pub fn is_complete(&self) -> bool {
        positive(self.weight_kg) && positive(self.height_cm) && self.age_years > 0
    }

    /// Names of the fields that make the profile incomplete
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !positive(self.weight_kg) {
            missing.push("weight_kg");
        }
        if !positive(self.height_cm) {
            missing.push("height_cm");
        }
        if self.age_years == 0 {
            missing.push("age_years");
        }
        missing
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
