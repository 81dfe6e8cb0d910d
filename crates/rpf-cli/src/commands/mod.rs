pub mod evaluate;
pub mod solver;
