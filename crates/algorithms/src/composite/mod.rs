//! Annual composite synthesis

mod cascade;
mod gaps;

pub use cascade::{
    build_annual_composite, masked_reflectance, temporal_median, AnnualComposite, CascadeParams,
    REFLECTANCE_OFFSET, REFLECTANCE_SCALE,
};
pub use gaps::{connected_components, small_gap_mask, ComponentLabels, Connectivity};
