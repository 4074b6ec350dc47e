pub mod frames;
pub mod simulation;
pub mod worm;
