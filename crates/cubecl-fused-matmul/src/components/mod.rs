/// Tensor descriptors and their builders.
pub mod descriptor;
/// Stock elementwise transforms.
pub mod elementwise;

mod blueprint;
mod error;
mod ident;
mod launch;
mod layout;
mod pipeline;
mod problem;
mod spec;
mod specialization;
mod tile_map;
mod validity;

pub use blueprint::*;
pub use error::*;
pub use ident::*;
pub use launch::*;
pub use layout::*;
pub use pipeline::*;
pub use problem::*;
pub use spec::*;
pub use specialization::*;
pub use tile_map::*;
pub use validity::*;
