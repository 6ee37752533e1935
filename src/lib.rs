//! Road Simulation Library
//!
//! Vehicles wander a road network built from map data, turning around at
//! roadblocks and leaving when they drive out of view.

pub mod simulation;
