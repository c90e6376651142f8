pub mod location;
pub mod scored;
pub mod intermediate;
pub mod merge;
