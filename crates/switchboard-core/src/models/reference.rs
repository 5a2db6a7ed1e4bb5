//! Global reference data: countries, currencies, languages, cities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SwitchboardError, SwitchboardResult};
use crate::validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Country,
    Currency,
    Language,
    City,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Country => "country",
            ReferenceKind::Currency => "currency",
            ReferenceKind::Language => "language",
            ReferenceKind::City => "city",
        }
    }

    /// Canonical code form: ISO country and currency codes upper-case,
    /// language tags lower-case, city codes as given.
    pub fn normalize_code(&self, code: &str) -> String {
        let code = code.trim();
        match self {
            ReferenceKind::Country | ReferenceKind::Currency => code.to_ascii_uppercase(),
            ReferenceKind::Language => code.to_ascii_lowercase(),
            ReferenceKind::City => code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: Uuid,
    pub kind: ReferenceKind,
    pub code: String,
    pub name: String,
    /// For cities: the owning country code.
    pub parent_code: Option<String>,
    /// For currencies: the display symbol.
    pub symbol: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReferenceItem {
    pub code: String,
    pub name: String,
    pub parent_code: Option<String>,
    pub symbol: Option<String>,
}

impl CreateReferenceItem {
    pub fn validate(&self, kind: ReferenceKind) -> SwitchboardResult<()> {
        validate::name("code", &self.code)?;
        validate::name("name", &self.name)?;
        if kind == ReferenceKind::City && self.parent_code.is_none() {
            return Err(SwitchboardError::validation(
                "a city requires the parent_code of its country",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateReferenceItem {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_normalized_per_kind() {
        assert_eq!(ReferenceKind::Country.normalize_code(" ke "), "KE");
        assert_eq!(ReferenceKind::Currency.normalize_code("kes"), "KES");
        assert_eq!(ReferenceKind::Language.normalize_code("SW"), "sw");
        assert_eq!(ReferenceKind::City.normalize_code("NBO"), "NBO");
    }

    #[test]
    fn city_needs_country() {
        let input = CreateReferenceItem {
            code: "NBO".into(),
            name: "Nairobi".into(),
            parent_code: None,
            symbol: None,
        };
        assert!(input.validate(ReferenceKind::City).is_err());
        assert!(input.validate(ReferenceKind::Language).is_ok());
    }
}
