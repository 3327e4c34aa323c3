// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! peerdap-core - ARM debug register concepts used by peerdap.
//!
//! Designed to be used in conjunction with the `peerdap-swd` library, which
//! bit-bangs the ARM Serial Wire Debug (SWD) protocol to reach a peer chip's
//! debug port.
//!
//! This crate contains no protocol logic.  It provides strongly typed
//! descriptions of the Debug Port (DP) and Access Port (AP) registers, and
//! the [`arm::register::Reg`] address type used to build SWD request frames.
//!
//! This library is `no_std` compatible, and requires an `alloc`
//! implementation.

#![no_std]

pub mod arm;

extern crate alloc;

/// Value reported by any read that did not complete successfully.
///
/// A caller that ignores an error sees an implausible value rather than stale
/// memory.
pub const SENTINEL: u32 = 0xFFFF_FFFF;
