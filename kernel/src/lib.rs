//! Tangram kernel
//!
//! A single-core bare-metal kernel for ARMv6 BCM2835-class boards that
//! hosts exactly one user program behind a hardware-enforced privilege
//! boundary.
//!
//! # Architecture
//!
//! The kernel is organized into the following modules:
//! - `arch`: Architecture-specific code (ARMv6 MMU, domains, traps)
//! - `boot`: Boot sequence from register-bank acquisition to user entry
//! - `components`: Compile-time selectable kernel components (console)
//! - `drivers`: Peripheral register-bank handles (GPIO, timer, mailbox)
//! - `video`: Framebuffer negotiation and blitting
//! - `sched`: Tick-driven update/draw callback scheduling
//! - `syscall`: The supervisor-call ABI exposed to user code
//! - `loader`: The segment-loading interface consumed from the ELF loader
//!
//! Two ARM domains carry the privilege model: domain 0 holds kernel-owned
//! regions and stays at Manager, domain 1 holds user-owned and selectively
//! exposed regions and is Client while user code runs. Trap handlers
//! elevate domain 1 to Manager for their own duration through a scoped
//! guard and restore the previous word on every return path.

#![cfg_attr(not(test), no_std)]

// Module declarations
pub mod arch;
pub mod components;
pub mod config;
pub mod debug;
pub mod drivers;
pub mod loader;
pub mod memory;
pub mod sched;
pub mod syscall;
pub mod video;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod boot;
