pub mod cfads;
pub mod operating_debt;
pub mod sizing;
