pub mod equity;
pub mod summary;
pub mod tax;
pub mod terminal;
