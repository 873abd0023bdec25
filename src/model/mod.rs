pub mod component;
pub mod label;
pub mod row;
pub mod table;

pub use component::{Component, Weighting};
pub use label::{Label, Strength, Trend};
pub use row::{BenchmarkRow, PortfolioRow, Prediction, ReturnRow};
pub use table::{PortCol, WideRow};
