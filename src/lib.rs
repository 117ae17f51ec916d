//! Motif scoring and enrichment binning for binding-selection count tables.
//!
//! A [`motif::AffinityModel`] scores every probe of a [`table::ProbeTable`]
//! ([`scoring`]); probes are ranked by score and cut into fixed-size bins whose
//! round-1 / round-0 read ratio forms an [`binning::EnrichmentReport`]
//! ([`binning`]), which [`report`] writes out for plotting or persistence.

pub mod binning;
pub mod error;
pub mod motif;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod sequence;
pub mod table;
pub mod types;
