//! Vehicle registry entity and the normalised plate-number newtype.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::UserId;

/// Normalised registration plate: trimmed, uppercased, non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PlateNumber(String);

impl PlateNumber {
    /// Parse and normalise a plate number.
    ///
    /// # Errors
    /// Returns [`InvalidPlate`] when the trimmed input is empty.
    pub fn parse(raw: &str) -> Result<Self, InvalidPlate> {
        let normalised = raw.trim().to_uppercase();
        if normalised.is_empty() {
            Err(InvalidPlate)
        } else {
            Ok(Self(normalised))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for PlateNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marker error for empty plate input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("plate number must not be empty")]
pub struct InvalidPlate;

/// A registered vehicle and its owner snapshot.
///
/// Owner name and phone are denormalised onto citations at issuance so the
/// citation remains a faithful record if the registration later changes.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub id: Uuid,
    pub plate: PlateNumber,
    pub owner_id: UserId,
    pub owner_name: String,
    pub owner_phone: String,
    pub vehicle_type: String,
    pub make: Option<String>,
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("DL01AB1234", "DL01AB1234")]
    #[case("  dl01ab1234 ", "DL01AB1234")]
    #[case("mh 12 cd 998", "MH 12 CD 998")]
    fn plate_normalises(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(PlateNumber::parse(raw).expect("plate").as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn plate_rejects_blank(#[case] raw: &str) {
        assert_eq!(PlateNumber::parse(raw), Err(InvalidPlate));
    }
}
