pub mod aggregate;
pub mod contracted;
pub mod merchant;
pub mod volume;
