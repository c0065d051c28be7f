//! Kernel components
//!
//! Minimal components built into the kernel for essential functionality,
//! composed at compile time via cargo features.
//!
//! The only component today is the debug console: just enough output for
//! `kprintln!` and trap diagnostics. Peripherals that carry kernel
//! semantics (timer, GPIO, mailbox) are register-bank handles under
//! `drivers/` instead, owned by the boot sequence.

pub mod console;
