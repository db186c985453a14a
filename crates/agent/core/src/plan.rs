//! Proficiency-tiered training plans.
//!
//! A plan maps proficiency ranges to the recipe being worked and the material it
//! needs. The machine re-evaluates the tier on every Idle entry and after every
//! success.

use serde::{Deserialize, Serialize};

use crate::config::ConversionVia;
use crate::error::ConfigError;
use crate::state::KindTag;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    /// Tiers in ascending proficiency order.
    pub tiers: Vec<TrainingTier>,
    /// Proficiency at which the plan is complete.
    pub cap: f32,
    /// Crafted output melted down whenever the tier changes and when the plan ends.
    #[serde(default)]
    pub recycle: Option<Recycle>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingTier {
    pub name: String,
    /// Inclusive lower bound.
    pub min: f32,
    /// Exclusive upper bound.
    pub max: f32,
    /// Capability name used while in this tier.
    pub capability: String,
    #[serde(default)]
    pub material: Option<MaterialNeed>,
}

/// Material the tier consumes, restocked when the backpack holds less than `amount`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialNeed {
    pub kind: KindTag,
    pub amount: u32,
}

/// Crafted kinds turned back into material, e.g. smelting practice weapons.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recycle {
    pub kinds: Vec<KindTag>,
    pub via: ConversionVia,
    #[serde(default = "default_recycle_batches")]
    pub batch_limit: u32,
}

fn default_recycle_batches() -> u32 {
    100
}

impl TrainingPlan {
    /// Index of the tier covering `proficiency`, if any.
    pub fn tier_for(&self, proficiency: f32) -> Option<usize> {
        self.tiers
            .iter()
            .position(|tier| proficiency >= tier.min && proficiency < tier.max)
    }

    pub fn tier(&self, index: usize) -> Option<&TrainingTier> {
        self.tiers.get(index)
    }

    pub fn is_complete(&self, proficiency: f32) -> bool {
        proficiency >= self.cap
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for tier in &self.tiers {
            if tier.min >= tier.max {
                return Err(ConfigError::InvalidTier {
                    name: tier.name.clone(),
                    min: tier.min,
                    max: tier.max,
                });
            }
        }
        Ok(())
    }

    /// Startup precondition: the current proficiency must fall into some tier
    /// unless the plan is already complete.
    pub fn check_start(&self, proficiency: f32) -> Result<(), ConfigError> {
        if self.is_complete(proficiency) || self.tier_for(proficiency).is_some() {
            Ok(())
        } else {
            Err(ConfigError::NoTierForProficiency { proficiency })
        }
    }
}
