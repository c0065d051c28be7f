//! Timer-tick scheduler
//!
//! The system timer compare interrupt is the only preemption point. Each
//! tick acknowledges the match, runs the registered update callback,
//! runs the draw callback and presents the frame it returns, then rearms
//! the compare for the next period boundary.
//!
//! Rearming happens last so a slow frame skips ticks instead of
//! stacking them; deadlines stay phase-locked to a fixed epoch (see
//! [`next_deadline`]), so the skip does not shift the tick grid.

use tangram_abi::{DrawFn, UpdateFn};

use crate::config;
use crate::drivers::SystemTimer;
use crate::video::Display;

/// The kernel-owned callback registration.
///
/// Written by syscall 1, read by every tick. Both slots change together:
/// a registration replaces the whole pair. The pair is `Copy` so a tick
/// can snapshot it out of the registration lock before the callbacks
/// run; a callback issuing a supervisor call takes that lock again.
#[derive(Clone, Copy, Default)]
pub struct CallbackSlots {
    update: Option<UpdateFn>,
    draw: Option<DrawFn>,
}

impl CallbackSlots {
    pub const fn new() -> Self {
        Self {
            update: None,
            draw: None,
        }
    }

    /// Install a callback pair, replacing any previous registration.
    pub fn install(&mut self, update: Option<UpdateFn>, draw: Option<DrawFn>) {
        self.update = update;
        self.draw = draw;
    }

    pub fn update(&self) -> Option<UpdateFn> {
        self.update
    }

    pub fn draw(&self) -> Option<DrawFn> {
        self.draw
    }
}

/// Everything one tick needs, borrowed from the boot-owned state.
pub struct TickContext<'a, D: Display> {
    pub timer: &'a SystemTimer,
    pub slots: CallbackSlots,
    pub display: Option<&'a mut D>,
}

/// Next deadline after counter value `t`: the following multiple of
/// `period` from the counter epoch. Phase-locked, so consecutive
/// deadlines never drift even when servicing ran long.
///
/// Wrapping arithmetic: the free-running counter rolls over after about
/// 71 minutes, and the compare register matches on the low word alone,
/// so the deadline must roll over with it.
#[inline]
pub fn next_deadline(t: u32, period: u32) -> u32 {
    t.wrapping_sub(t % period).wrapping_add(period)
}

/// Service one timer tick.
pub fn run_tick<D: Display>(ctx: &mut TickContext<'_, D>) {
    ctx.timer.clear_match(config::TIMER_CHANNEL);

    if let Some(update) = ctx.slots.update() {
        update();
    }
    if let Some(draw) = ctx.slots.draw() {
        let frame = draw();
        if let (Some(display), false) = (ctx.display.as_deref_mut(), frame.is_null()) {
            display.present(frame);
        }
    }

    let now = ctx.timer.counter_low();
    let deadline = next_deadline(now, config::TICK_PERIOD_US);
    ctx.timer.set_compare(config::TIMER_CHANNEL, deadline);

    #[cfg(feature = "debug-tick")]
    crate::kprintln!("[sched] tick now={} next={}", now, deadline);
}
