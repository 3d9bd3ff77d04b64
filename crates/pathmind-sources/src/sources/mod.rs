//! Concrete HTTP clients, one per upstream.

pub mod chembl;
pub mod opentargets;
pub mod pubchem;
pub mod reactome;
pub mod uniprot;
