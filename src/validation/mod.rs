//! Accuracy validation against synthetic ground truth

pub mod accuracy;

pub use accuracy::{AccuracyStatistics, AccuracyValidator};
