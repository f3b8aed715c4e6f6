//! Small containers shared by the player controls

mod ring;

pub use ring::IndexedRing;
