#![deny(dead_code)]
#![deny(unused_imports)]
pub mod manifest;
pub mod matrix;
pub mod pipeline;
pub mod plan;
pub mod pool;
pub mod progress;
pub mod reduce;
pub mod shard;
pub mod types;
pub mod worker;
