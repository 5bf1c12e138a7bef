pub mod datasets;
pub mod jobs;
pub mod status;
