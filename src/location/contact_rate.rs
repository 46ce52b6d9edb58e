use serde::{Deserialize, Serialize};

use crate::error::PandemicError;

/// How many contacts a location produces per tick, for each of the three contact groups.
///
/// For a group with `n` possible pairs the sampler draws `max(min, floor(fraction × n))` pairs
/// (see [`crate::contacts::compute_contacts`]).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactRate {
    /// Minimum assignee–assignee contacts.
    pub min_assignees: usize,
    /// Minimum assignee–visitor contacts.
    pub min_assignees_visitors: usize,
    /// Minimum visitor–visitor contacts.
    pub min_visitors: usize,
    pub fraction_assignees: f64,
    pub fraction_assignees_visitors: f64,
    pub fraction_visitors: f64,
}

impl ContactRate {
    #[must_use]
    pub const fn new(
        min_assignees: usize,
        min_assignees_visitors: usize,
        min_visitors: usize,
        fraction_assignees: f64,
        fraction_assignees_visitors: f64,
        fraction_visitors: f64,
    ) -> ContactRate {
        ContactRate {
            min_assignees,
            min_assignees_visitors,
            min_visitors,
            fraction_assignees,
            fraction_assignees_visitors,
            fraction_visitors,
        }
    }

    /// A contact rate that never produces a contact.
    #[must_use]
    pub const fn zero() -> ContactRate {
        ContactRate::new(0, 0, 0, 0.0, 0.0, 0.0)
    }

    /// `(minimum, fraction)` for the assignee×assignee, assignee×visitor and visitor×visitor
    /// groups, in that order.
    #[must_use]
    pub fn constraints(&self) -> [(usize, f64); 3] {
        [
            (self.min_assignees, self.fraction_assignees),
            (self.min_assignees_visitors, self.fraction_assignees_visitors),
            (self.min_visitors, self.fraction_visitors),
        ]
    }

    /// Keeps this rate's minimums and scales the `initial` fractions by `1 - social_distancing`.
    #[must_use]
    pub fn with_social_distancing(&self, initial: &ContactRate, social_distancing: f64) -> ContactRate {
        let keep = 1.0 - social_distancing;
        ContactRate {
            fraction_assignees: keep * initial.fraction_assignees,
            fraction_assignees_visitors: keep * initial.fraction_assignees_visitors,
            fraction_visitors: keep * initial.fraction_visitors,
            ..*self
        }
    }

    pub fn validate(&self) -> Result<(), PandemicError> {
        for (name, fraction) in [
            ("fraction_assignees", self.fraction_assignees),
            ("fraction_assignees_visitors", self.fraction_assignees_visitors),
            ("fraction_visitors", self.fraction_visitors),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(PandemicError::InvalidRule(format!(
                    "{name} must be within [0, 1], got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn social_distancing_scales_initial_fractions_only() {
        let initial = ContactRate::new(2, 1, 0, 0.5, 0.2, 0.1);
        let current = ContactRate::new(5, 5, 5, 0.9, 0.9, 0.9);
        let distanced = current.with_social_distancing(&initial, 0.25);
        assert_eq!(distanced.min_assignees, 5);
        assert_eq!(distanced.min_assignees_visitors, 5);
        assert_eq!(distanced.min_visitors, 5);
        assert_approx_eq!(distanced.fraction_assignees, 0.375);
        assert_approx_eq!(distanced.fraction_assignees_visitors, 0.15);
        assert_approx_eq!(distanced.fraction_visitors, 0.075);
    }

    #[test]
    fn full_distancing_zeroes_fractions() {
        let initial = ContactRate::new(1, 1, 1, 0.5, 0.5, 0.5);
        let distanced = initial.with_social_distancing(&initial, 1.0);
        assert_eq!(distanced.constraints().map(|(_, f)| f), [0.0; 3]);
    }

    #[test]
    fn validation_rejects_out_of_range_fractions() {
        assert!(ContactRate::new(0, 0, 0, 1.0, 0.0, 0.5).validate().is_ok());
        assert!(ContactRate::new(0, 0, 0, 1.5, 0.0, 0.0).validate().is_err());
        assert!(ContactRate::new(0, 0, 0, 0.0, -0.1, 0.0).validate().is_err());
        assert!(ContactRate::new(0, 0, 0, 0.0, 0.0, f64::NAN).validate().is_err());
    }
}
