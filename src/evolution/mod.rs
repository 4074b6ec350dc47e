pub mod genes;
pub mod genome;
pub mod innovation;
pub mod network;
pub mod population;
pub mod selection;
pub mod species;
