//! System call interface
//!
//! Dispatches on the call number the user program left in the first
//! argument register. The table is fixed and small; unknown numbers are
//! accepted as no-ops returning zero so a newer user program on an older
//! kernel degrades instead of faulting.
//!
//! | number | arguments            | effect                       | return |
//! |--------|----------------------|------------------------------|--------|
//! | 1      | update_ptr, draw_ptr | register tick callbacks      | 0      |
//! | 2      | —                    | sample tick-counter parity   | 0 or 1 |
//! | 42     | mask                 | clear indicator output lines | 0      |
//! | 43     | mask                 | set indicator output lines   | 0      |
//! | other  | —                    | no-op                        | 0      |

use tangram_abi::{DrawFn, UpdateFn, SYS_LED_CLEAR, SYS_LED_SET, SYS_REGISTER_CALLBACKS, SYS_TIME_PARITY};

use crate::config;
use crate::sched::CallbackSlots;
use crate::drivers::{Gpio, SystemTimer};

/// Kernel state a syscall may touch, borrowed for the duration of the
/// dispatch.
pub struct SyscallContext<'a> {
    pub slots: &'a mut CallbackSlots,
    pub gpio: &'a Gpio,
    pub timer: &'a SystemTimer,
}

/// Whether a user-supplied code address is acceptable as a callback
/// target: null (meaning "unregister") or inside the user program's
/// executable window.
fn valid_callback_addr(addr: u32) -> bool {
    addr == 0 || config::USER_EXEC_WINDOW.contains(&(addr as usize))
}

/// Dispatch one supervisor call. Runs with the user domain elevated and
/// IRQs masked by the trap entry.
pub fn dispatch(ctx: &mut SyscallContext<'_>, number: u32, arg1: u32, arg2: u32) -> u32 {
    #[cfg(feature = "debug-syscall")]
    crate::kprintln!("[syscall] n={} a1={:#x} a2={:#x}", number, arg1, arg2);

    match number {
        SYS_REGISTER_CALLBACKS => sys_register_callbacks(ctx, arg1, arg2),
        SYS_TIME_PARITY => sys_time_parity(ctx),
        SYS_LED_CLEAR => {
            ctx.gpio.clear_bank1_mask(arg1);
            0
        }
        SYS_LED_SET => {
            ctx.gpio.set_bank1_mask(arg1);
            0
        }
        _ => {
            #[cfg(feature = "debug-syscall")]
            crate::kprintln!("[syscall] unknown number {}", number);
            0
        }
    }
}

/// Syscall 1: install the update/draw callback pair.
///
/// Both addresses are validated against the user executable window
/// before the registration is accepted; a rejected pair leaves the
/// previous registration untouched. Null pointers unregister.
fn sys_register_callbacks(ctx: &mut SyscallContext<'_>, update: u32, draw: u32) -> u32 {
    if !valid_callback_addr(update) || !valid_callback_addr(draw) {
        #[cfg(feature = "debug-syscall")]
        crate::kprintln!(
            "[syscall] rejected callbacks update={:#x} draw={:#x}",
            update,
            draw
        );
        return 0;
    }

    // Addresses were range-checked above; transmuting to the ABI
    // function types is the trust boundary of this call.
    let update_fn: Option<UpdateFn> =
        (update != 0).then(|| unsafe { core::mem::transmute::<usize, UpdateFn>(update as usize) });
    let draw_fn: Option<DrawFn> =
        (draw != 0).then(|| unsafe { core::mem::transmute::<usize, DrawFn>(draw as usize) });

    ctx.slots.install(update_fn, draw_fn);
    0
}

/// Syscall 2: one low-order bit of the running microsecond counter, a
/// coarse free "clock" for user code with no timer access.
fn sys_time_parity(ctx: &SyscallContext<'_>) -> u32 {
    (ctx.timer.counter_low() >> config::TIME_PARITY_BIT) & 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4))]
    struct FakeBank([u32; 16]);

    struct Fixture {
        gpio_bank: FakeBank,
        timer_bank: FakeBank,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                gpio_bank: FakeBank([0; 16]),
                timer_bank: FakeBank([0; 16]),
            }
        }

        fn gpio(&mut self) -> Gpio {
            unsafe { Gpio::new(self.gpio_bank.0.as_mut_ptr() as usize) }
        }

        fn timer(&mut self) -> SystemTimer {
            unsafe { SystemTimer::new(self.timer_bank.0.as_mut_ptr() as usize) }
        }
    }

    extern "C" fn noop_update() {}

    #[test]
    fn test_led_syscalls_hit_bank1_registers() {
        let mut fx = Fixture::new();
        let gpio = fx.gpio();
        let timer = fx.timer();
        let mut slots = CallbackSlots::new();
        let mut ctx = SyscallContext {
            slots: &mut slots,
            gpio: &gpio,
            timer: &timer,
        };

        assert_eq!(dispatch(&mut ctx, SYS_LED_SET, 1 << 15, 0), 0);
        assert_eq!(fx.gpio_bank.0[0x20 / 4], 1 << 15); // GPSET1
        assert_eq!(dispatch(&mut ctx, SYS_LED_CLEAR, 1 << 15, 0), 0);
        assert_eq!(fx.gpio_bank.0[0x2C / 4], 1 << 15); // GPCLR1
    }

    #[test]
    fn test_time_parity_samples_configured_bit() {
        let mut fx = Fixture::new();
        fx.timer_bank.0[1] = 1 << config::TIME_PARITY_BIT; // CLO
        let gpio = fx.gpio();
        let timer = fx.timer();
        let mut slots = CallbackSlots::new();
        let mut ctx = SyscallContext {
            slots: &mut slots,
            gpio: &gpio,
            timer: &timer,
        };

        assert_eq!(dispatch(&mut ctx, SYS_TIME_PARITY, 0, 0), 1);
        fx.timer_bank.0[1] = 0;
        assert_eq!(dispatch(&mut ctx, SYS_TIME_PARITY, 0, 0), 0);
    }

    #[test]
    fn test_register_validates_window() {
        let mut fx = Fixture::new();
        let gpio = fx.gpio();
        let timer = fx.timer();
        let mut slots = CallbackSlots::new();

        let inside = config::USER_EXEC_WINDOW.start as u32 + 0x100;
        let outside = config::USER_EXEC_WINDOW.end as u32;

        let mut ctx = SyscallContext {
            slots: &mut slots,
            gpio: &gpio,
            timer: &timer,
        };
        // Kernel-space address rejected, slots untouched
        assert_eq!(dispatch(&mut ctx, SYS_REGISTER_CALLBACKS, 0x8000, outside), 0);
        assert!(ctx.slots.update().is_none());
        assert!(ctx.slots.draw().is_none());

        // In-window pair accepted
        assert_eq!(dispatch(&mut ctx, SYS_REGISTER_CALLBACKS, inside, inside), 0);
        assert!(ctx.slots.update().is_some());
        assert!(ctx.slots.draw().is_some());

        // Null pair unregisters
        assert_eq!(dispatch(&mut ctx, SYS_REGISTER_CALLBACKS, 0, 0), 0);
        assert!(ctx.slots.update().is_none());
        assert!(ctx.slots.draw().is_none());
    }

    #[test]
    fn test_rejected_pair_keeps_previous_registration() {
        let mut fx = Fixture::new();
        let gpio = fx.gpio();
        let timer = fx.timer();
        let mut slots = CallbackSlots::new();
        slots.install(Some(noop_update), None);

        let mut ctx = SyscallContext {
            slots: &mut slots,
            gpio: &gpio,
            timer: &timer,
        };
        dispatch(&mut ctx, SYS_REGISTER_CALLBACKS, 0xDEAD_0000, 0);
        assert!(ctx.slots.update().is_some());
    }

    #[test]
    fn test_unknown_number_is_a_silent_noop() {
        let mut fx = Fixture::new();
        let gpio = fx.gpio();
        let timer = fx.timer();
        let mut slots = CallbackSlots::new();
        let mut ctx = SyscallContext {
            slots: &mut slots,
            gpio: &gpio,
            timer: &timer,
        };

        assert_eq!(dispatch(&mut ctx, 999, 7, 7), 0);
        assert!(ctx.slots.update().is_none());
        assert!(fx.gpio_bank.0.iter().all(|&w| w == 0));
    }
}
