//! Reconciles declared signature fields with the fields an external render surface produced.

pub(crate) mod adapter;
pub(crate) mod schedule;
pub(crate) mod service;
