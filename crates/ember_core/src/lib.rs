//! Core of the ember particle kernel.
//!
//! The kernel simulates pools of short-lived particles organized into
//! [`group::Group`]s inside a [`system::System`]. Emitters decide how many
//! particles appear each frame and where; modifiers run over whole groups
//! in priority order; actions react to particle deaths across groups.
//! Everything configurable round-trips through [`io::Descriptor`] records.
//!
//! This crate holds the simulation machinery only; the stock catalog of
//! modifiers, initializers and actions lives in `ember_effects`.

pub mod action;
pub mod dataset;
pub mod emitter;
pub mod error;
pub mod group;
pub mod initializer;
pub mod io;
pub mod iter;
pub mod math;
pub mod modifier;
pub mod object;
pub mod particle;
pub mod prelude;
pub mod system;
pub mod zone;
