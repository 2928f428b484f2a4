// Library exports for the faultline spectrum-based fault localization engine
pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod formula;
pub mod localizer;
pub mod ranking;
pub mod spectra;

// Re-export key types for convenience
pub use config::LocalizationConfig;
pub use coverage::{parse_lcov, LineKey, TestCoverage};
pub use engine::{FaultLocalizer, Localization};
pub use error::{Result, SpectraError};
pub use formula::{FnFormula, Formula, FormulaRegistry, SpectrumCounts};
pub use localizer::{ComputationStrategy, Localizable, Localizer};
pub use ranking::{NormalizationStrategy, NormalizedRanking, RankedNode, Ranking, TieBreak};
pub use spectra::{
    HierarchicalSpectra, Node, NodeKey, Spectra, SpectraSource, Trace, TraceMut, TraceOutcome,
};
