mod common;

use common::town_sim;
use pandemic_sim::prelude::*;

const POPULATION: usize = 60;

#[test]
fn testing_counters_are_conserved() {
    let mut sim = town_sim(POPULATION, 4, 11);
    for _ in 0..20 * HOURS_PER_DAY {
        sim.step();
        let state = sim.state();
        for view in [
            &state.global_testing_state,
            &state.primary_testing_state,
            &state.variant_testing_state,
        ] {
            assert_eq!(view.total(), POPULATION);
        }
    }
    assert!(sim.state().global_testing_state.num_tests > 0);
}

#[test]
fn non_infection_probabilities_stay_in_bounds() {
    let mut sim = town_sim(POPULATION, 8, 5);
    for _ in 0..5 * HOURS_PER_DAY {
        sim.step();
        for state in sim.state().person_states.values() {
            for strain in Strain::ALL {
                let strain = state.strain(strain);
                assert!((0.0..=1.0).contains(&strain.not_infection_probability));
                assert!(strain
                    .not_infection_probability_history
                    .iter()
                    .all(|(_, p)| (0.0..=1.0).contains(p)));
            }
        }
    }
}

#[test]
fn dead_results_are_final_and_recovery_needs_a_positive_result() {
    let mut sim = town_sim(POPULATION, 10, 3);
    let mut previous: Vec<TestResult> = vec![TestResult::Untested; POPULATION];
    let mut ever_positive = vec![false; POPULATION];
    for _ in 0..40 {
        sim.step_day(HOURS_PER_DAY);
        for (index, state) in sim.state().person_states.values().enumerate() {
            let result = state.test_result;
            if previous[index] == TestResult::Dead {
                assert_eq!(result, TestResult::Dead);
            }
            if result.to_summary(Some(previous[index])) == InfectionSummary::Recovered {
                assert!(ever_positive[index]);
            }
            ever_positive[index] |= matches!(result, TestResult::Positive | TestResult::Critical);
            previous[index] = result;
        }
    }
}

#[test]
fn identical_inputs_give_identical_runs() {
    let mut first = town_sim(POPULATION, 4, 99);
    let mut second = town_sim(POPULATION, 4, 99);
    let regulations = default_regulations();
    for day in 0..15 {
        let regulation = &regulations[day % regulations.len()];
        first.impose_regulation(regulation).unwrap();
        second.impose_regulation(regulation).unwrap();
        first.step_day(HOURS_PER_DAY);
        second.step_day(HOURS_PER_DAY);
        assert_eq!(first.state(), second.state());
    }
}

#[test]
fn different_seeds_diverge() {
    let mut first = town_sim(POPULATION, 4, 1);
    let mut second = town_sim(POPULATION, 4, 2);
    first.step_day(10 * HOURS_PER_DAY);
    second.step_day(10 * HOURS_PER_DAY);
    assert_ne!(first.state(), second.state());
}

#[test]
fn reset_replays_from_the_initial_state() {
    let mut sim = town_sim(POPULATION, 4, 8);
    let initial = sim.state().clone();
    sim.step_day(5 * HOURS_PER_DAY);
    sim.reset();
    assert_eq!(sim.state(), &initial);
    sim.step_day(HOURS_PER_DAY);
    assert_eq!(sim.state().population_size(), POPULATION);
}

#[test]
fn imposing_a_regulation_twice_changes_nothing() {
    for regulation in default_regulations() {
        let mut sim = town_sim(POPULATION, 4, 21);
        sim.step_day(30);
        sim.impose_regulation(&regulation).unwrap();
        let once = sim.state().clone();
        sim.impose_regulation(&regulation).unwrap();
        let twice = sim.state();

        for (location, state) in &once.location_states {
            let again = &twice.location_states[location];
            assert_eq!(state.contact_rate, again.contact_rate);
            assert_eq!(state.lock, again.lock);
            assert_eq!(state.visitor_capacity, again.visitor_capacity);
        }
        for (person, state) in &once.person_states {
            let again = &twice.person_states[person];
            assert_eq!(state.policy, again.policy);
            assert_eq!(state.primary.spread_multiplier, again.primary.spread_multiplier);
            assert_eq!(state.variant.spread_multiplier, again.variant.spread_multiplier);
        }
        assert_eq!(twice.regulation_stage, regulation.stage);
        assert_eq!(twice.regulation_stage_sum, 2 * u64::from(regulation.stage));
    }
}

#[test]
fn regulations_replace_each_other() {
    let mut sim = town_sim(POPULATION, 0, 4);
    let regulations = default_regulations();
    sim.impose_regulation(&regulations[4]).unwrap();
    sim.impose_regulation(&regulations[1]).unwrap();
    let mut reference = town_sim(POPULATION, 0, 4);
    reference.impose_regulation(&regulations[1]).unwrap();
    for (location, state) in &sim.state().location_states {
        let expected = &reference.state().location_states[location];
        assert_eq!(state.contact_rate, expected.contact_rate);
        assert_eq!(state.lock, expected.lock);
    }
}
