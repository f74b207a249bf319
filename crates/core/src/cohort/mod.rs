pub mod band;
pub mod similarity;

pub use band::{band_from_products, CohortBand, BAND_SUFFIX};
pub use similarity::{
    cohort_by_family, cohort_by_family_at, select_similar, select_similar_at, SimilarityTarget,
    DEFAULT_TOP_N,
};
