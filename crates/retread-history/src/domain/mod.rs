//! Pure history state: the journal cursor, row effects and descriptions.

pub mod describe;
pub mod effect;
pub mod journal;
