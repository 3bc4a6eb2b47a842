pub mod daemon;
pub mod level;
pub mod send;
