pub mod listeners;
pub mod overlay;
pub mod scroll;
