//! CSV reporting of simulation output.
//!
//! Each report type is a flat, serializable row type implementing [`Report`] (usually through
//! [`define_report!`](crate::define_report)). A [`ReportWriter`] opens one file per report type,
//! `<output_dir>/<file_prefix><name>.csv`, and appends one row per [`ReportWriter::send_report`].
//!
//! ```no_run
//! use pandemic_sim::report::{DailySummaryReport, ReportWriter};
//! # fn run(sim: &mut pandemic_sim::sim::PandemicSim) -> Result<(), pandemic_sim::error::PandemicError> {
//! let mut writer = ReportWriter::new("output").file_prefix("run_1_");
//! writer.add_report::<DailySummaryReport>()?;
//! for _ in 0..30 {
//!     sim.step_day(24);
//!     writer.send_report(&DailySummaryReport::from_state(sim.state()))?;
//! }
//! # Ok(())
//! # }
//! ```
use std::any::TypeId;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::error::PandemicError;
use crate::hashing::HashMap;
use crate::infection::InfectionSummary;
use crate::log::info;
use crate::sim::PandemicSimState;

pub trait Report: Serialize + 'static {
    /// File stem of this report type.
    fn name() -> &'static str;
}

/// Implements [`Report`] for a row type, naming its output file.
#[macro_export]
macro_rules! define_report {
    ($report:ident, $name:expr) => {
        impl $crate::report::Report for $report {
            fn name() -> &'static str {
                $name
            }
        }
    };
}
pub use define_report;

pub struct ReportWriter {
    output_dir: PathBuf,
    file_prefix: String,
    overwrite: bool,
    file_writers: HashMap<TypeId, Writer<File>>,
}

impl ReportWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> ReportWriter {
        ReportWriter {
            output_dir: output_dir.into(),
            file_prefix: String::new(),
            overwrite: false,
            file_writers: HashMap::default(),
        }
    }

    #[must_use]
    pub fn file_prefix(mut self, file_prefix: impl Into<String>) -> Self {
        self.file_prefix = file_prefix.into();
        self
    }

    /// Allows `add_report` to replace existing files.
    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn path_for<T: Report>(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.csv", self.file_prefix, T::name()))
    }

    /// Creates the output file of report type `T`, and any missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and overwriting is disabled, or if it cannot be
    /// created.
    pub fn add_report<T: Report>(&mut self) -> Result<(), PandemicError> {
        let path = self.path_for::<T>();
        if path.exists() && !self.overwrite {
            return Err(PandemicError::ReportError(format!(
                "{} already exists and overwrite is disabled",
                path.display()
            )));
        }
        create_dir_all(&self.output_dir)?;
        let file = File::create(&path)?;
        info!("writing {} report to {}", T::name(), path.display());
        self.file_writers
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    /// Appends `report` as a row of its report file.
    ///
    /// # Errors
    ///
    /// Returns an error if `add_report` was not called for this report type, or if writing
    /// fails.
    pub fn send_report<T: Report>(&mut self, report: &T) -> Result<(), PandemicError> {
        let writer = self
            .file_writers
            .get_mut(&TypeId::of::<T>())
            .ok_or_else(|| {
                PandemicError::ReportError(format!("no writer added for report {}", T::name()))
            })?;
        writer.serialize(report)?;
        writer.flush()?;
        Ok(())
    }
}

/// One row per simulated day: regulation, infection and testing counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailySummaryReport {
    pub day: u32,
    pub regulation_stage: u32,
    pub average_stage: f64,
    pub none: usize,
    pub exposed: usize,
    pub infected: usize,
    pub critical: usize,
    pub recovered: usize,
    pub dead: usize,
    pub primary_infected: usize,
    pub variant_infected: usize,
    pub tested_infected: usize,
    pub tested_critical: usize,
    pub tested_recovered: usize,
    pub tested_dead: usize,
    pub primary_tested_infected: usize,
    pub variant_tested_infected: usize,
    pub num_tests: usize,
    pub infection_above_threshold: bool,
}

define_report!(DailySummaryReport, "daily_summary");

impl DailySummaryReport {
    #[must_use]
    pub fn from_state(state: &PandemicSimState) -> DailySummaryReport {
        let infection = |summary| {
            state
                .global_infection_summary
                .get(&summary)
                .copied()
                .unwrap_or(0)
        };
        let tested = |summary| state.global_testing_state.count(summary);
        DailySummaryReport {
            day: state.sim_time.day,
            regulation_stage: state.regulation_stage,
            average_stage: state.average_stage(),
            none: infection(InfectionSummary::None),
            exposed: infection(InfectionSummary::Exposed),
            infected: infection(InfectionSummary::Infected),
            critical: infection(InfectionSummary::Critical),
            recovered: infection(InfectionSummary::Recovered),
            dead: infection(InfectionSummary::Dead),
            primary_infected: state
                .primary_infection_summary
                .get(&InfectionSummary::Infected)
                .copied()
                .unwrap_or(0),
            variant_infected: state
                .variant_infection_summary
                .get(&InfectionSummary::Infected)
                .copied()
                .unwrap_or(0),
            tested_infected: tested(InfectionSummary::Infected),
            tested_critical: tested(InfectionSummary::Critical),
            tested_recovered: tested(InfectionSummary::Recovered),
            tested_dead: tested(InfectionSummary::Dead),
            primary_tested_infected: state
                .primary_testing_state
                .count(InfectionSummary::Infected),
            variant_tested_infected: state
                .variant_testing_state
                .count(InfectionSummary::Infected),
            num_tests: state.global_testing_state.num_tests,
            infection_above_threshold: state.infection_above_threshold,
        }
    }
}
