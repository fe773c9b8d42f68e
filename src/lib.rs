//! Composes histogram/evolution charts from a metrics-query service and
//! forwards lightweight usage beacons to an ingestion endpoint.
pub mod app;
pub mod domain;
pub mod infra;
pub mod ports;
