//! Architecture-specific code
//!
//! This module contains all architecture-dependent implementations.
//! Currently only ARMv6 (ARM1176-class cores) is supported.

pub mod armv6;
