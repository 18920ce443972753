//! Rent model configurations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::RentError;

/// Rent indexed by a fixed rate every `frequency` years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedEscalationConfig {
    /// Rent in the base year.
    pub base_rent: Decimal,
    /// Escalation per step (e.g., 0.03 for 3%).
    pub escalation_rate: Decimal,
    /// Years between escalation steps.
    pub frequency: u32,
    /// Year in which `base_rent` applies.
    pub base_year: i32,
}

impl FixedEscalationConfig {
    /// Returns structural problems with this config; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.base_rent.is_sign_negative() {
            errors.push("Base rent must not be negative".to_string());
        }
        if self.escalation_rate <= Decimal::NEGATIVE_ONE {
            errors.push("Escalation rate must be greater than -100%".to_string());
        }
        if self.frequency == 0 {
            errors.push("Escalation frequency must be at least 1 year".to_string());
        }
        errors
    }
}

/// Rent as a percentage of revenue with an optional floor and cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueShareConfig {
    /// Share of revenue in percent (10 means 10%).
    pub revenue_share_pct: Decimal,
    /// Floor applied before the cap.
    #[serde(default)]
    pub minimum_rent: Option<Decimal>,
    /// Cap applied after the floor.
    #[serde(default)]
    pub maximum_rent: Option<Decimal>,
}

impl RevenueShareConfig {
    /// Returns structural problems with this config; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.revenue_share_pct.is_sign_negative() || self.revenue_share_pct > Decimal::ONE_HUNDRED {
            errors.push("Revenue share must be between 0% and 100%".to_string());
        }
        if self.minimum_rent.is_some_and(|min| min.is_sign_negative()) {
            errors.push("Minimum rent must not be negative".to_string());
        }
        if self.maximum_rent.is_some_and(|max| max.is_sign_negative()) {
            errors.push("Maximum rent must not be negative".to_string());
        }
        if let (Some(min), Some(max)) = (self.minimum_rent, self.maximum_rent)
            && min > max
        {
            errors.push(format!(
                "Minimum rent ({min}) must not exceed maximum rent ({max})"
            ));
        }
        errors
    }
}

/// Rent as a yield on the partner's capital outlay for land and building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerModelConfig {
    /// Land area in square metres.
    pub land_size: Decimal,
    /// Land price per square metre.
    pub land_price_per_sqm: Decimal,
    /// Built-up area in square metres.
    pub bua_size: Decimal,
    /// Construction price per built-up square metre.
    pub bua_price_per_sqm: Decimal,
    /// Yield in percent in the base year (8 means 8%).
    pub yield_base: Decimal,
    /// Yield growth per step.
    pub growth_rate: Decimal,
    /// Years between yield growth steps.
    pub growth_frequency: u32,
    /// Year in which `yield_base` applies.
    pub base_year: i32,
}

impl PartnerModelConfig {
    /// Returns structural problems with this config; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let non_negative = [
            (self.land_size, "Land size"),
            (self.land_price_per_sqm, "Land price per sqm"),
            (self.bua_size, "BUA size"),
            (self.bua_price_per_sqm, "BUA price per sqm"),
            (self.yield_base, "Base yield"),
        ];
        for (value, label) in non_negative {
            if value.is_sign_negative() {
                errors.push(format!("{label} must not be negative"));
            }
        }
        if self.growth_rate <= Decimal::NEGATIVE_ONE {
            errors.push("Yield growth rate must be greater than -100%".to_string());
        }
        if self.growth_frequency == 0 {
            errors.push("Yield growth frequency must be at least 1 year".to_string());
        }
        errors
    }

    /// Partner capex: land and building outlay. `None` on overflow.
    #[must_use]
    pub fn capex_base(&self) -> Option<Decimal> {
        let land = self.land_size.checked_mul(self.land_price_per_sqm)?;
        let building = self.bua_size.checked_mul(self.bua_price_per_sqm)?;
        land.checked_add(building)
    }
}

/// A validated rent model.
///
/// Deserialises from `{"model": <tag>, "config": {...}}` and rejects unknown
/// tags, mismatched config shapes, and configs that fail validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaggedRentModel", into = "TaggedRentModel")]
pub enum RentModel {
    /// Fixed escalation.
    FixedEscalation(FixedEscalationConfig),
    /// Revenue share.
    RevenueShare(RevenueShareConfig),
    /// Partner yield model.
    PartnerModel(PartnerModelConfig),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "model", content = "config")]
enum TaggedRentModel {
    FixedEscalation(FixedEscalationConfig),
    RevenueShare(RevenueShareConfig),
    PartnerModel(PartnerModelConfig),
}

impl RentModel {
    /// Tag for fixed escalation.
    pub const FIXED_ESCALATION: &'static str = "FixedEscalation";
    /// Tag for revenue share.
    pub const REVENUE_SHARE: &'static str = "RevenueShare";
    /// Tag for the partner model.
    pub const PARTNER_MODEL: &'static str = "PartnerModel";

    /// Builds a model from a free-form tag and config payload.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` for an unrecognised tag, `ConfigShape` when the
    /// payload does not match the tag, and `InvalidConfig` when validation
    /// fails.
    pub fn from_tagged(tag: &str, config: serde_json::Value) -> Result<Self, RentError> {
        fn parse<T: serde::de::DeserializeOwned>(
            model: &'static str,
            config: serde_json::Value,
        ) -> Result<T, RentError> {
            serde_json::from_value(config).map_err(|e| RentError::ConfigShape {
                model,
                reason: e.to_string(),
            })
        }

        let model = match tag {
            Self::FIXED_ESCALATION => Self::FixedEscalation(parse(Self::FIXED_ESCALATION, config)?),
            Self::REVENUE_SHARE => Self::RevenueShare(parse(Self::REVENUE_SHARE, config)?),
            Self::PARTNER_MODEL => Self::PartnerModel(parse(Self::PARTNER_MODEL, config)?),
            other => return Err(RentError::UnknownModel(other.to_string())),
        };
        model.ensure_valid()
    }

    /// Returns the model tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FixedEscalation(_) => Self::FIXED_ESCALATION,
            Self::RevenueShare(_) => Self::REVENUE_SHARE,
            Self::PartnerModel(_) => Self::PARTNER_MODEL,
        }
    }

    /// Returns structural problems with the config; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        match self {
            Self::FixedEscalation(config) => config.validate(),
            Self::RevenueShare(config) => config.validate(),
            Self::PartnerModel(config) => config.validate(),
        }
    }

    fn ensure_valid(self) -> Result<Self, RentError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(RentError::InvalidConfig {
                model: self.name(),
                errors,
            })
        }
    }
}

impl TryFrom<TaggedRentModel> for RentModel {
    type Error = RentError;

    fn try_from(tagged: TaggedRentModel) -> Result<Self, Self::Error> {
        let model = match tagged {
            TaggedRentModel::FixedEscalation(config) => Self::FixedEscalation(config),
            TaggedRentModel::RevenueShare(config) => Self::RevenueShare(config),
            TaggedRentModel::PartnerModel(config) => Self::PartnerModel(config),
        };
        model.ensure_valid()
    }
}

impl From<RentModel> for TaggedRentModel {
    fn from(model: RentModel) -> Self {
        match model {
            RentModel::FixedEscalation(config) => Self::FixedEscalation(config),
            RentModel::RevenueShare(config) => Self::RevenueShare(config),
            RentModel::PartnerModel(config) => Self::PartnerModel(config),
        }
    }
}
