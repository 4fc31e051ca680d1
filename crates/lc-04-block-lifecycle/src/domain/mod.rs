//! Domain logic with no dependency on the open block.

pub mod red_filter;
pub mod rewards;
pub mod validators;

pub use red_filter::RedFilter;
pub use rewards::split_reward;
pub use validators::{diff_validators, ValidatorUpdate};
