pub mod block;
pub mod grid;
pub mod world;
