//! Test suites for the automation bridge.

pub(crate) mod support;
