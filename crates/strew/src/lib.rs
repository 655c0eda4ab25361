#![doc = include_str!("../README.md")]

mod batch;
mod correlation;
mod engine;
mod error;
mod fetch;
mod gather;
mod pool;
mod runner;
mod spawner;
mod unit;

pub use crate::batch::*;
pub use crate::correlation::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::fetch::*;
pub use crate::gather::*;
pub use crate::pool::*;
pub use crate::runner::*;
pub use crate::spawner::*;
pub use crate::unit::*;
