pub mod accumulator;
pub mod quantile;

pub use accumulator::Portfolio;
