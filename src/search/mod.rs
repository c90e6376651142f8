pub mod word;
pub mod fuzzy;
pub mod wildcard;
pub mod executor;
