//! Plain data shapes exchanged with the surrounding system.

pub mod body;
