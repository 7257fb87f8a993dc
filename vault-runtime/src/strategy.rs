//! Strategy validator.
//!
//! Strategies arrive as untrusted JSON (from the LLM or from a caller).
//! Decoding walks the object field by field and fails closed: unknown
//! fields and wrongly typed values are rejected with an error naming the
//! violated invariant.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::types::{Allocations, PortfolioStrategy, Preferences, RiskLevel};

/// Allowed deviation of `lending + liquidity` from 100.
pub const ALLOCATION_TOLERANCE: f64 = 0.01;

const STRATEGY_FIELDS: &[&str] = &["riskLevel", "allocations", "preferences"];
const ALLOCATION_FIELDS: &[&str] = &["lending", "liquidity"];
const PREFERENCE_FIELDS: &[&str] = &["stablecoinsOnly", "preferredAssets", "minimumAPY"];

fn reject_unknown(
    obj: &Map<String, Value>,
    allowed: &[&str],
    prefix: &str,
) -> Result<(), ValidationError> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(k) if prefix.is_empty() => Err(ValidationError::UnknownField(k.clone())),
        Some(k) => Err(ValidationError::UnknownField(format!("{prefix}.{k}"))),
        None => Ok(()),
    }
}

fn percentage(obj: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    let raw = obj.get(field).ok_or(ValidationError::MissingField(field))?;
    match raw.as_f64() {
        Some(v) if v.is_finite() && (0.0..=100.0).contains(&v) => Ok(v),
        _ => Err(ValidationError::InvalidAllocation {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Decode and validate a strategy from arbitrary JSON.
pub fn parse_strategy(value: &Value) -> Result<PortfolioStrategy, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;
    reject_unknown(obj, STRATEGY_FIELDS, "")?;

    let risk_level = match obj.get("riskLevel") {
        None => return Err(ValidationError::MissingField("riskLevel")),
        Some(Value::String(s)) => {
            RiskLevel::parse(s).ok_or_else(|| ValidationError::InvalidRiskLevel(s.clone()))?
        }
        Some(other) => return Err(ValidationError::InvalidRiskLevel(other.to_string())),
    };

    let allocations = obj
        .get("allocations")
        .ok_or(ValidationError::MissingField("allocations"))?
        .as_object()
        .ok_or(ValidationError::MissingField("allocations"))?;
    reject_unknown(allocations, ALLOCATION_FIELDS, "allocations")?;
    let allocations = Allocations {
        lending: percentage(allocations, "lending")?,
        liquidity: percentage(allocations, "liquidity")?,
    };

    let preferences = obj
        .get("preferences")
        .ok_or(ValidationError::MissingField("preferences"))?
        .as_object()
        .ok_or(ValidationError::MissingField("preferences"))?;
    reject_unknown(preferences, PREFERENCE_FIELDS, "preferences")?;

    let stablecoins_only = match preferences.get("stablecoinsOnly") {
        None => return Err(ValidationError::MissingField("preferences.stablecoinsOnly")),
        Some(v) => v.as_bool().ok_or(ValidationError::StablecoinsOnlyNotBoolean)?,
    };

    let preferred_assets = match preferences.get("preferredAssets") {
        None => return Err(ValidationError::MissingField("preferences.preferredAssets")),
        Some(Value::Array(items)) => items
            .iter()
            .map(|i| i.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or(ValidationError::PreferredAssetsNotList)?,
        Some(_) => return Err(ValidationError::PreferredAssetsNotList),
    };

    let minimum_apy = match preferences.get("minimumAPY") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_f64()
                .ok_or_else(|| ValidationError::InvalidMinimumApy(v.to_string()))?,
        ),
    };

    let strategy = PortfolioStrategy {
        risk_level,
        allocations,
        preferences: Preferences {
            stablecoins_only,
            preferred_assets,
            minimum_apy,
        },
    };
    validate(&strategy)?;
    Ok(strategy)
}

/// Check the numeric invariants of an already-typed strategy.
pub fn validate(strategy: &PortfolioStrategy) -> Result<(), ValidationError> {
    let Allocations { lending, liquidity } = strategy.allocations;
    for (field, value) in [("lending", lending), ("liquidity", liquidity)] {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ValidationError::InvalidAllocation {
                field,
                value: value.to_string(),
            });
        }
    }

    let total = lending + liquidity;
    if (total - 100.0).abs() > ALLOCATION_TOLERANCE {
        return Err(ValidationError::AllocationSum {
            lending,
            liquidity,
            total,
        });
    }

    if let Some(min) = strategy.preferences.minimum_apy {
        if !min.is_finite() || min < 0.0 {
            return Err(ValidationError::InvalidMinimumApy(min.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conservative() -> Value {
        json!({
            "riskLevel": "conservative",
            "allocations": { "lending": 80, "liquidity": 20 },
            "preferences": {
                "stablecoinsOnly": true,
                "preferredAssets": ["USDC"],
                "minimumAPY": 4
            }
        })
    }

    #[test]
    fn test_valid_strategy() {
        let strategy = parse_strategy(&conservative()).unwrap();
        assert_eq!(strategy.risk_level, RiskLevel::Conservative);
        assert_eq!(strategy.allocations.lending, 80.0);
        assert!(strategy.preferences.stablecoins_only);
        assert_eq!(strategy.preferences.minimum_apy, Some(4.0));
    }

    #[test]
    fn test_minimum_apy_optional() {
        let mut raw = conservative();
        raw["preferences"].as_object_mut().unwrap().remove("minimumAPY");
        let strategy = parse_strategy(&raw).unwrap();
        assert_eq!(strategy.preferences.minimum_apy, None);
    }

    #[test]
    fn test_sum_within_tolerance() {
        let mut raw = conservative();
        raw["allocations"] = json!({ "lending": 66.666, "liquidity": 33.334 });
        assert!(parse_strategy(&raw).is_ok());

        raw["allocations"] = json!({ "lending": 70, "liquidity": 20 });
        assert!(matches!(
            parse_strategy(&raw),
            Err(ValidationError::AllocationSum { .. })
        ));

        raw["allocations"] = json!({ "lending": 50, "liquidity": 50.02 });
        assert!(parse_strategy(&raw).is_err());
    }

    #[test]
    fn test_invalid_risk_level() {
        let mut raw = conservative();
        raw["riskLevel"] = json!("yolo");
        assert_eq!(
            parse_strategy(&raw),
            Err(ValidationError::InvalidRiskLevel("yolo".into()))
        );

        raw["riskLevel"] = json!("Conservative");
        assert!(parse_strategy(&raw).is_err());
    }

    #[test]
    fn test_preference_shapes() {
        let mut raw = conservative();
        raw["preferences"]["stablecoinsOnly"] = json!("yes");
        assert_eq!(
            parse_strategy(&raw),
            Err(ValidationError::StablecoinsOnlyNotBoolean)
        );

        let mut raw = conservative();
        raw["preferences"]["preferredAssets"] = json!("USDC");
        assert_eq!(
            parse_strategy(&raw),
            Err(ValidationError::PreferredAssetsNotList)
        );

        let mut raw = conservative();
        raw["preferences"]["preferredAssets"] = json!(["USDC", 7]);
        assert_eq!(
            parse_strategy(&raw),
            Err(ValidationError::PreferredAssetsNotList)
        );

        let mut raw = conservative();
        raw["preferences"]["minimumAPY"] = json!(-1);
        assert!(matches!(
            parse_strategy(&raw),
            Err(ValidationError::InvalidMinimumApy(_))
        ));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut raw = conservative();
        raw["leverage"] = json!(3);
        assert_eq!(
            parse_strategy(&raw),
            Err(ValidationError::UnknownField("leverage".into()))
        );

        let mut raw = conservative();
        raw["allocations"]["staking"] = json!(0);
        assert_eq!(
            parse_strategy(&raw),
            Err(ValidationError::UnknownField("allocations.staking".into()))
        );
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            parse_strategy(&json!([])),
            Err(ValidationError::NotAnObject)
        );
        let mut raw = conservative();
        raw.as_object_mut().unwrap().remove("allocations");
        assert_eq!(
            parse_strategy(&raw),
            Err(ValidationError::MissingField("allocations"))
        );
    }

    #[test]
    fn test_out_of_range_allocation() {
        let mut raw = conservative();
        raw["allocations"] = json!({ "lending": 120, "liquidity": -20 });
        assert!(matches!(
            parse_strategy(&raw),
            Err(ValidationError::InvalidAllocation { field: "lending", .. })
        ));
    }
}
