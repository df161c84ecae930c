//! # Placeholder Workload
//!
//! The four pluggable step bodies of the data pipeline and the randomness
//! source they draw from. Tests swap [`RandomWorkload`] for [`FixedWorkload`].

pub mod source;
pub mod steps;

pub use source::{FixedWorkload, RandomWorkload, Workload};
pub use steps::{
    standard_pipeline, DataAnalysis, DataPreparation, DataProcessing, ReportGeneration,
    ANALYSIS_METHODS, CHART_OPTIONS, PROCESSING_TYPES, REPORT_FORMATS,
};
