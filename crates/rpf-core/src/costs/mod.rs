pub mod fixed;
pub mod operational_capex;
pub mod opex;
