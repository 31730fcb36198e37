pub mod common;

mod headline_aggregation;
