//! Console component trait
//!
//! Provides a minimal console interface for kernel debug output.
//! This is NOT a full UART driver - just enough for `kprintln!` and the
//! fatal-trap diagnostics to get bytes out.

/// Console trait for kernel debug output
///
/// Implementations block until the hardware accepts each byte; there is
/// no buffering and no interrupt use, so the console works from any trap
/// context, including the fatal halt paths.
pub trait Console: Send + Sync {
    /// Write a single character to the console
    fn putc(&self, c: u8);

    /// Write a string to the console
    ///
    /// Default implementation writes character by character.
    fn puts(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.putc(b'\r'); // CRLF for terminals
            }
            self.putc(byte);
        }
    }
}

// Component implementations
pub mod null;
pub mod pl011;
