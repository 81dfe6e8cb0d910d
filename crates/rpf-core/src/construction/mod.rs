pub mod capex;
pub mod debt;
pub mod equity;
pub mod funding;
