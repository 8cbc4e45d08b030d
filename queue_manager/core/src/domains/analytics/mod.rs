pub mod rollup;

pub use rollup::{rollup, AnalyticsBundle, Bucket, BucketGranularity};
