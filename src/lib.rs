//! # Cinder inter-hart notification layer
//!
//! The event-notification layer of the Cinder firmware runtime: lets any
//! hart ask one, several, or all other harts to asynchronously run a small
//! fixed set of firmware-level actions (raise a deferred software
//! interrupt, run the remote-fence queue, halt), with no lost notifications
//! and no double execution, built on shared memory and hardware doorbell
//! interrupts alone.
//!
//! No OS threads, locks, or scheduler exist at this layer; the per-hart
//! pending word in [`pending`] and one write barrier are the whole
//! synchronization mechanism. See [`ipi::Ipi`] for the engine.

#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]
// Strict safety enforcement
#![deny(clippy::not_unsafe_ptr_arg_deref)]
#![deny(clippy::cast_ptr_alignment)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(static_mut_refs)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]
#![cfg_attr(not(test), no_std)]

pub mod arch;
#[cfg(feature = "dtb")]
pub mod dtb;
pub mod error;
pub mod event;
pub mod fence;
pub mod hart;
pub mod ipi;
mod pending;
pub mod platform;
pub mod scratch;

pub use crate::error::{Error, Result};
pub use crate::event::{EventHandler, IpiKind};
pub use crate::hart::{HartId, HartMask, HartRegistry, LocalHart, MAX_HARTS};
pub use crate::ipi::Ipi;
