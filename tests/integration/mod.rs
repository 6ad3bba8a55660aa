//! Integration tests for the gallery synchronization layer

mod album_store;
mod bulk_mutation;
mod cli_routing;
mod config_integration;
mod dependent_loader;
