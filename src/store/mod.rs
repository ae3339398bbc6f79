//! Committed field values handed to the host.

pub(crate) mod values;
