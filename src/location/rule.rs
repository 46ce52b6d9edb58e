use serde::{Deserialize, Serialize};

use crate::error::PandemicError;
use crate::location::{ContactRate, LocationType};

/// A field-level rule override.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RuleValue<T> {
    /// Keep whatever the location currently has.
    Unchanged,
    /// Restore the location's initial value.
    Default,
    Set(T),
}

impl<T> Default for RuleValue<T> {
    fn default() -> Self {
        RuleValue::Unchanged
    }
}

impl<T: Clone> RuleValue<T> {
    /// Writes the rule into `target`, reading `initial` for [`RuleValue::Default`].
    pub fn apply(&self, target: &mut T, initial: &T) {
        match self {
            RuleValue::Unchanged => {}
            RuleValue::Default => *target = initial.clone(),
            RuleValue::Set(value) => *target = value.clone(),
        }
    }

    /// `other` wins unless it is `Unchanged`.
    #[must_use]
    pub fn or(self, other: RuleValue<T>) -> RuleValue<T> {
        match other {
            RuleValue::Unchanged => self,
            other => other,
        }
    }

    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, RuleValue::Unchanged)
    }
}

/// The rule state a regulation pushes to every location of a type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRule {
    pub contact_rate: RuleValue<ContactRate>,
    /// Closes the location to everybody, assignees included.
    pub lock: RuleValue<bool>,
    /// Maximum simultaneous visitors. `Default` restores the (possibly unlimited) initial value.
    pub visitor_capacity: RuleValue<usize>,
}

impl LocationRule {
    /// Field-level merge where the fields `other` sets take precedence.
    #[must_use]
    pub fn merge(self, other: LocationRule) -> LocationRule {
        LocationRule {
            contact_rate: self.contact_rate.or(other.contact_rate),
            lock: self.lock.or(other.lock),
            visitor_capacity: self.visitor_capacity.or(other.visitor_capacity),
        }
    }

    /// Checks that this rule makes sense for `location_type`.
    pub fn validate_for(&self, location_type: LocationType) -> Result<(), PandemicError> {
        if let RuleValue::Set(contact_rate) = &self.contact_rate {
            contact_rate.validate()?;
        }
        if matches!(self.lock, RuleValue::Set(true)) && !location_type.is_lockable() {
            return Err(PandemicError::InvalidRule(format!(
                "{location_type:?} locations cannot be locked"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_respects_each_variant() {
        let mut value = 3;
        RuleValue::Unchanged.apply(&mut value, &1);
        assert_eq!(value, 3);
        RuleValue::Set(7).apply(&mut value, &1);
        assert_eq!(value, 7);
        RuleValue::Default.apply(&mut value, &1);
        assert_eq!(value, 1);
    }

    #[test]
    fn merge_is_field_level() {
        let base = LocationRule {
            lock: RuleValue::Set(true),
            visitor_capacity: RuleValue::Set(10),
            ..LocationRule::default()
        };
        let other = LocationRule {
            contact_rate: RuleValue::Default,
            visitor_capacity: RuleValue::Set(4),
            ..LocationRule::default()
        };
        let merged = base.merge(other);
        assert_eq!(merged.contact_rate, RuleValue::Default);
        assert_eq!(merged.lock, RuleValue::Set(true));
        assert_eq!(merged.visitor_capacity, RuleValue::Set(4));
    }

    #[test]
    fn homes_and_hospitals_cannot_lock() {
        let lock = LocationRule {
            lock: RuleValue::Set(true),
            ..LocationRule::default()
        };
        assert!(lock.validate_for(LocationType::Bar).is_ok());
        assert!(lock.validate_for(LocationType::Home).is_err());
        assert!(lock.validate_for(LocationType::Hospital).is_err());
    }

    #[test]
    fn rules_deserialize_from_json() {
        let rule: LocationRule =
            serde_json::from_str(r#"{"lock": {"Set": true}, "contact_rate": "Default"}"#).unwrap();
        assert_eq!(rule.lock, RuleValue::Set(true));
        assert_eq!(rule.contact_rate, RuleValue::Default);
        assert!(rule.visitor_capacity.is_unchanged());
    }
}
