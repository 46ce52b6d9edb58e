//! Contact sampling.
//!
//! Every tick each location produces a set of contacts: person pairs drawn from the three
//! groups assignee×assignee, assignee×visitor and visitor×visitor. For a group with `n` possible
//! pairs the sample size is `max(minimum, floor(fraction × n))` where the fraction is drawn
//! around the location's configured fraction. Pairs are drawn with repetition by index and
//! deduplicated in draw order, so the result only depends on the generator.
//!
//! Pairs are never materialized: a drawn index is unranked directly into the pair it denotes,
//! in the order the pairs would be enumerated.
mod tracer;

use rand::Rng;
use rand_distr::{Distribution, Normal};

pub use tracer::{ContactTracer, MaxSlotContactTracer};

use crate::hashing::IndexSet;
use crate::location::LocationState;
use crate::person::PersonId;

/// Standard deviation of the per-tick contact fraction around the configured one.
pub const CONTACT_FRACTION_SIGMA: f64 = 0.01;

pub type Contact = (PersonId, PersonId);

/// Contacts of one location for one tick, in the order they were drawn.
pub type ContactSet = IndexSet<Contact>;

/// Start of row `i` when the unordered pairs `(i, j)`, `i < j < n`, are enumerated row by row.
fn row_start(i: u64, n: u64) -> u64 {
    i * n - i * (i + 1) / 2
}

/// The `k`-th unordered pair of `n` items in lexicographic order.
fn unrank_combination(k: u64, n: u64) -> (usize, usize) {
    let half_n = n as f64 - 0.5;
    let discriminant = (half_n * half_n - 2.0 * k as f64).max(0.0);
    let mut i = (half_n - discriminant.sqrt()).floor().max(0.0) as u64;
    // Floating point estimate, corrected exactly.
    while i > 0 && row_start(i, n) > k {
        i -= 1;
    }
    while i + 1 < n && row_start(i + 1, n) <= k {
        i += 1;
    }
    let j = i + 1 + (k - row_start(i, n));
    (i as usize, j as usize)
}

/// Draws the contact fraction for one group. A configured fraction of zero draws nothing.
fn sample_fraction<R: Rng + ?Sized>(fraction: f64, rng: &mut R) -> f64 {
    if fraction <= 0.0 {
        return 0.0;
    }
    Normal::new(fraction, CONTACT_FRACTION_SIGMA)
        .map_or(fraction, |normal| normal.sample(rng))
        .clamp(0.0, 1.0)
}

fn sample_size(minimum: usize, fraction: f64, num_possible: u64) -> usize {
    let from_fraction = (fraction * num_possible as f64).floor() as usize;
    minimum.max(from_fraction)
}

/// Draws this tick's contacts among the persons currently in `location`.
pub fn compute_contacts<R: Rng + ?Sized>(location: &LocationState, rng: &mut R) -> ContactSet {
    let assignees = &location.assignees_in_location;
    let visitors = &location.visitors_in_location;
    let [assignee_rate, mixed_rate, visitor_rate] = location.contact_rate.constraints();
    let mut contacts = ContactSet::default();

    for (group, (minimum, fraction)) in [
        (Group::Within(assignees), assignee_rate),
        (Group::Between(assignees, visitors), mixed_rate),
        (Group::Within(visitors), visitor_rate),
    ] {
        let num_possible = group.num_pairs();
        if num_possible == 0 {
            continue;
        }
        let fraction = sample_fraction(fraction, rng);
        for _ in 0..sample_size(minimum, fraction, num_possible) {
            let index = rng.random_range(0..num_possible);
            contacts.insert(group.pair(index));
        }
    }
    contacts
}

enum Group<'a> {
    /// Unordered pairs of distinct members.
    Within(&'a IndexSet<PersonId>),
    /// Every member of the first set with every member of the second.
    Between(&'a IndexSet<PersonId>, &'a IndexSet<PersonId>),
}

impl Group<'_> {
    fn num_pairs(&self) -> u64 {
        match self {
            Group::Within(members) => {
                let n = members.len() as u64;
                n * n.saturating_sub(1) / 2
            }
            Group::Between(first, second) => first.len() as u64 * second.len() as u64,
        }
    }

    fn pair(&self, index: u64) -> Contact {
        match self {
            Group::Within(members) => {
                let (i, j) = unrank_combination(index, members.len() as u64);
                (members[i], members[j])
            }
            Group::Between(first, second) => {
                let width = second.len() as u64;
                (
                    first[(index / width) as usize],
                    second[(index % width) as usize],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{ContactRate, Location, LocationId, LocationType};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn unranking_matches_enumeration() {
        for n in 2..40u64 {
            let mut k = 0;
            for i in 0..n as usize {
                for j in i + 1..n as usize {
                    assert_eq!(unrank_combination(k, n), (i, j), "n={n} k={k}");
                    k += 1;
                }
            }
            assert_eq!(k, n * (n - 1) / 2);
        }
    }

    #[test]
    fn unranking_large_populations() {
        let n = 100_000u64;
        let last = n * (n - 1) / 2 - 1;
        assert_eq!(unrank_combination(last, n), (n as usize - 2, n as usize - 1));
        assert_eq!(unrank_combination(row_start(777, n), n), (777, 778));
        assert_eq!(unrank_combination(row_start(778, n) - 1, n), (777, n as usize - 1));
    }

    fn location_with(rate: ContactRate, assignees: usize, visitors: usize) -> LocationState {
        let location = Location::new(LocationId(0), LocationType::Restaurant)
            .with_contact_rate(rate)
            .with_assignees((0..assignees).map(PersonId));
        let mut state = location.reset();
        for id in 0..assignees + visitors {
            state.add_person(PersonId(id));
        }
        state
    }

    #[test]
    fn zero_rate_produces_no_contacts() {
        let state = location_with(ContactRate::zero(), 10, 10);
        let mut rng = SmallRng::seed_from_u64(42);
        assert!(compute_contacts(&state, &mut rng).is_empty());
    }

    #[test]
    fn empty_groups_are_skipped() {
        // Minimums would ask for contacts but there is nobody to pair up.
        let state = location_with(ContactRate::new(3, 3, 3, 0.5, 0.5, 0.5), 1, 0);
        let mut rng = SmallRng::seed_from_u64(42);
        assert!(compute_contacts(&state, &mut rng).is_empty());
    }

    #[test]
    fn contacts_stay_within_their_groups() {
        let state = location_with(ContactRate::new(0, 5, 0, 0.0, 0.5, 0.0), 4, 6);
        let mut rng = SmallRng::seed_from_u64(1);
        let contacts = compute_contacts(&state, &mut rng);
        assert!(!contacts.is_empty());
        for &(a, b) in &contacts {
            assert!(state.assignees_in_location.contains(&a));
            assert!(state.visitors_in_location.contains(&b));
        }
    }

    #[test]
    fn full_fraction_draws_pairs_of_distinct_persons() {
        let state = location_with(ContactRate::new(0, 0, 0, 1.0, 0.0, 0.0), 20, 0);
        let mut rng = SmallRng::seed_from_u64(9);
        let contacts = compute_contacts(&state, &mut rng);
        // 190 draws with repetition over 190 pairs.
        assert!(contacts.len() > 100 && contacts.len() <= 190);
        assert!(contacts.iter().all(|&(a, b)| a < b));
    }

    #[test]
    fn minimum_applies_with_zero_fraction() {
        let state = location_with(ContactRate::new(1, 0, 0, 0.0, 0.0, 0.0), 2, 0);
        let mut rng = SmallRng::seed_from_u64(3);
        let contacts = compute_contacts(&state, &mut rng);
        assert_eq!(contacts.len(), 1);
        assert!(contacts.contains(&(PersonId(0), PersonId(1))));
    }

    #[test]
    fn reproducible_for_a_seed() {
        let state = location_with(ContactRate::new(2, 1, 1, 0.3, 0.2, 0.1), 15, 15);
        let first = compute_contacts(&state, &mut SmallRng::seed_from_u64(77));
        let second = compute_contacts(&state, &mut SmallRng::seed_from_u64(77));
        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
    }
}
