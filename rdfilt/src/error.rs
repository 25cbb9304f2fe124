//! Errors

use thiserror::Error;

/// Construction-time failures. Filtering itself is total on finite inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The coefficient table was empty.
    #[error("a filter needs at least one second-order section")]
    NoSections,

    /// The coefficient and initial-condition tables disagree on how many
    /// sections there are.
    #[error("coefficient table has {coeffs} sections but the initial-condition table has {inits}")]
    SectionCountMismatch { coeffs: usize, inits: usize },

    /// A section's b0 was not 1. The recursion assumes normalised sections;
    /// divide the numerator through by b0 first.
    #[error("section {0} is not normalised (b0 must be 1)")]
    UnnormalizedSection(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
