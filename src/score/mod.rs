mod segment;
pub mod writers;

pub use segment::{SegmentOutcome, SegmentScore};
