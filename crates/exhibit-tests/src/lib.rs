//! Integration test crate for Exhibit.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It wires the tour controller to a real audio engine over the headless
//! backend and drives both from a manual clock.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod authoring;

#[cfg(test)]
mod audio;
