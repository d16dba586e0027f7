//! Cross-edition verse alignment:
//! - the loaded divergence table (identity mapping by default)
//! - cluster resolution seeded from the canonical edition
//! - the documented cross-chapter exception table

pub mod exceptions;
pub mod resolver;
pub mod table;

pub use resolver::ClusterResolver;
pub use table::{AlignmentDoc, AlignmentError, AlignmentPair, AlignmentTable};
