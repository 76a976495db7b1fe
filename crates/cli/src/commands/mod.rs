//! CLI commands for the regime options strategy.

pub mod classify;
pub mod positions;
pub mod preflight;
pub mod size;
pub mod trade;

pub use classify::{run_classify, ClassifyArgs};
pub use positions::{run_positions, PositionsArgs};
pub use preflight::{run_preflight, PreflightArgs};
pub use size::{run_size, SizeArgs};
pub use trade::{run_loop, run_once, Backend};
