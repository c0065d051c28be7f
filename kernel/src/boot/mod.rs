//! Boot sequence and kernel-owned state
//!
//! `kernel_entry` is the first Rust code after the assembly stub. It
//! brings the machine up in dependency order:
//! 1. console, so everything after it can report
//! 2. peripheral register bank handles (the `Board`)
//! 3. translation tables, domain word, MMU and caches
//! 4. firmware negotiation: core clock, pixel order, framebuffer
//! 5. vector table, timer compare, interrupt routing
//! 6. user table activation, program load, drop to user mode
//!
//! This module also owns the statics the trap handlers borrow from:
//! the board, the callback slots, and the screen. Handlers run with
//! IRQs masked on a single core, so the spin locks here are
//! uncontended; they exist to keep the borrows honest.

use core::cell::UnsafeCell;

use spin::{Mutex, Once};
use tangram_abi::ClockId;

use crate::arch::armv6::{self, domain, exception, mmu};
use crate::arch::armv6::mmu::{SectionFlags, TranslationTable};
use crate::config;
use crate::drivers::property::{tags, PropertyMessage, PIXEL_ORDER_PROBE};
use crate::drivers::{clock, Gpio, InterruptController, Mailbox, MailboxError, SystemTimer};
use crate::drivers::gpio::LineFunction;
use crate::kprintln;
use crate::loader::{self, Segment, UserImage};
use crate::memory::{PhysAddr, VirtAddr, SECTION_SIZE};
use crate::sched::{self, CallbackSlots, TickContext};
use crate::syscall::SyscallContext;
use crate::video::framebuffer::FramebufferRequest;
use crate::video::Screen;

/// The peripheral register bank handles, acquired once at startup.
pub struct Board {
    pub gpio: Gpio,
    pub timer: SystemTimer,
    pub interrupts: InterruptController,
    pub mailbox: Mailbox,
}

impl Board {
    /// # Safety
    /// Must be constructed at most once; the handles assume exclusive
    /// ownership of their register banks.
    unsafe fn new() -> Self {
        Self {
            gpio: Gpio::new(config::GPIO_BASE),
            timer: SystemTimer::new(config::TIMER_BASE),
            interrupts: InterruptController::new(config::INTC_BASE),
            mailbox: Mailbox::new(config::MAILBOX_BASE),
        }
    }
}

/// Static cell for data mutated only from strictly serialized contexts
/// (boot runs before IRQs are unmasked; handlers run with IRQs masked).
#[repr(transparent)]
struct BootCell<T>(UnsafeCell<T>);

unsafe impl<T> Sync for BootCell<T> {}

impl<T> BootCell<T> {
    const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }
}

static BOARD: Once<Board> = Once::new();
static CALLBACKS: Mutex<CallbackSlots> = Mutex::new(CallbackSlots::new());
static SCREEN: Mutex<Option<Screen>> = Mutex::new(None);

static KERNEL_TABLE: BootCell<TranslationTable> = BootCell::new(TranslationTable::new());
static USER_TABLE: BootCell<TranslationTable> = BootCell::new(TranslationTable::new());

// Coprocessor-shared buffers, placed in the section mapped without
// caching so the firmware sees request words directly. One static per
// concurrent use, never aliased.
#[link_section = ".dmem"]
static FB_REQUEST: BootCell<FramebufferRequest> = BootCell::new(FramebufferRequest::new());
#[link_section = ".dmem"]
static PROBE_MSG: BootCell<PropertyMessage<1>> = BootCell::new(PropertyMessage::new());
#[link_section = ".dmem"]
static QUERY_MSG: BootCell<PropertyMessage<2>> = BootCell::new(PropertyMessage::new());
#[link_section = ".dmem"]
static SET_MSG: BootCell<PropertyMessage<3>> = BootCell::new(PropertyMessage::new());
#[link_section = ".dmem"]
static PAN_MSG: BootCell<PropertyMessage<2>> = BootCell::new(PropertyMessage::new());

/// Fallback user program: parks in a branch-to-self. Replaced by a real
/// image when one is linked in.
static IDLE_PROGRAM: [u8; 4] = 0xEAFF_FFFEu32.to_le_bytes(); // b .

/// The board handles, if startup has produced them yet. Trap handlers
/// use this so a fault before board bring-up degrades instead of
/// recursing.
pub fn try_board() -> Option<&'static Board> {
    BOARD.get()
}

/// Borrow the syscall-visible state for one dispatch.
pub fn with_syscall_context(f: impl FnOnce(&mut SyscallContext<'_>) -> u32) -> u32 {
    let Some(board) = BOARD.get() else {
        return 0;
    };
    let mut slots = CALLBACKS.lock();
    let mut ctx = SyscallContext {
        slots: &mut slots,
        gpio: &board.gpio,
        timer: &board.timer,
    };
    f(&mut ctx)
}

/// Borrow the tick-visible state for one timer interrupt.
pub fn with_tick_context(f: impl FnOnce(&mut TickContext<'_, Screen>)) {
    let Some(board) = BOARD.get() else {
        return;
    };
    // Snapshot the pair and release the lock before any callback runs:
    // a callback issuing `svc` re-enters `with_syscall_context`, which
    // takes CALLBACKS again.
    let slots = *CALLBACKS.lock();
    let mut screen = SCREEN.lock();
    let mut ctx = TickContext {
        timer: &board.timer,
        slots,
        display: screen.as_mut(),
    };
    f(&mut ctx);
}

/// First Rust code after the assembly stub. Never returns: ends by
/// dropping to user mode (or parking on an unrecoverable setup failure).
pub extern "C" fn kernel_entry() -> ! {
    config::init_console();
    kprintln!("[boot] tangram {}", env!("CARGO_PKG_VERSION"));

    let board = BOARD.call_once(|| unsafe { Board::new() });
    board.gpio.set_function(config::LED_LINE, LineFunction::Output);

    unsafe {
        build_tables();
        // DACR must be live before translation starts; a zeroed word
        // faults the next fetch
        domain::write_dacr(domain::DACR_DEFAULT);
        mmu::enable(&*KERNEL_TABLE.0.get());
    }
    kprintln!("[mmu] sections mapped, caches on");

    if let Err(e) = survey_clocks(board) {
        kprintln!("[clock] survey failed: {:?}", e);
    }
    probe_pixel_order(board);
    init_video(board);

    unsafe { exception::install() };
    start_ticking(board);
    kprintln!("[sched] tick armed, period {} us", config::TICK_PERIOD_US);

    unsafe {
        mmu::activate(&*USER_TABLE.0.get());
    }
    let entry = match load_user() {
        Ok(entry) => entry,
        Err(e) => {
            kprintln!("[loader] {:?}", e);
            park()
        }
    };

    kprintln!("[boot] entering user program at {:#x}", entry);
    unsafe {
        armv6::enable_irqs();
        armv6::enter_user(entry, config::USER_EXEC_WINDOW.start + config::USER_MEM_SIZE)
    }
}

/// Build the kernel and user translation tables.
///
/// Kernel table: identity map, cached RAM, uncached peripheral and
/// coprocessor-shared sections, everything domain 0. User table: the
/// same plus the user program window and the re-tagged MMIO sections.
unsafe fn build_tables() {
    let kernel = &mut *KERNEL_TABLE.0.get();
    kernel.map_identity_range(0, crate::memory::TABLE_ENTRIES, SectionFlags::KERNEL_NORMAL);
    // Peripheral window: device memory, never cached
    kernel.map_identity_range(config::PERIPHERAL_BASE, 16, SectionFlags::COPROC_SHARED);
    // The section holding mailbox buffers; the firmware reads it over
    // the bus, so it bypasses the caches too
    extern "C" {
        static __dmem_start: u8;
    }
    let dmem = &__dmem_start as *const u8 as usize;
    kernel.map_section(
        VirtAddr::new(dmem),
        PhysAddr::new(dmem),
        SectionFlags::COPROC_SHARED,
    );

    let user = &mut *USER_TABLE.0.get();
    user.copy_from(kernel);
    for i in 0..config::USER_MEM_SIZE / SECTION_SIZE {
        user.map_section(
            VirtAddr::new(config::USER_EXEC_WINDOW.start + i * SECTION_SIZE),
            PhysAddr::new(config::USER_PHYS_BASE + i * SECTION_SIZE),
            SectionFlags::USER_NORMAL,
        );
    }
    for &window in config::USER_MMIO_WINDOWS {
        user.map_section(
            VirtAddr::new(window),
            PhysAddr::new(window),
            SectionFlags::USER_MMIO,
        );
    }
}

/// Log every clock the firmware exposes, then run the core at the
/// midpoint of its supported range: comfortably above the boot default
/// without trusting the turbo envelope.
fn survey_clocks(board: &Board) -> Result<(), MailboxError> {
    let query = unsafe { &mut *QUERY_MSG.0.get() };
    for id in ClockId::ALL {
        let current = clock::clock_rate(&board.mailbox, query, id)?;
        let min = clock::min_clock_rate(&board.mailbox, query, id)?;
        let max = clock::max_clock_rate(&board.mailbox, query, id)?;
        kprintln!("[clock] {:?}: {} Hz (range {}..{})", id, current, min, max);
    }

    let min = clock::min_clock_rate(&board.mailbox, query, ClockId::Arm)?;
    let max = clock::max_clock_rate(&board.mailbox, query, ClockId::Arm)?;
    let set = unsafe { &mut *SET_MSG.0.get() };
    let actual = clock::set_clock_rate(&board.mailbox, set, ClockId::Arm, min + (max - min) / 2)?;
    kprintln!("[clock] arm core now {} Hz", actual);
    Ok(())
}

/// Probe the firmware's pixel channel order. Purely diagnostic here; a
/// sentinel echo means the property channel is dead and video will fail
/// loudly right after.
fn probe_pixel_order(board: &Board) {
    let probe = unsafe { &mut *PROBE_MSG.0.get() };
    match probe.submit(&board.mailbox, tags::GET_PIXEL_ORDER, [PIXEL_ORDER_PROBE]) {
        Ok(()) => match tangram_abi::PixelOrder::from_u32(probe.value(0)) {
            Some(order) => kprintln!("[video] pixel order {:?}", order),
            None => kprintln!("[video] bad pixel order response {}", probe.value(0)),
        },
        Err(e) => kprintln!("[video] pixel order probe failed: {:?}", e),
    }
}

/// Negotiate the framebuffer and stand up the screen. A headless boot
/// (rejected negotiation) keeps running: ticks still fire, frames are
/// dropped.
fn init_video(board: &'static Board) {
    let request = unsafe { &mut *FB_REQUEST.0.get() };
    match request.negotiate(&board.mailbox, &config::DISPLAY) {
        Ok(mut fb) => {
            kprintln!(
                "[video] {}x{} double-buffered surface up",
                config::DISPLAY.width,
                config::DISPLAY.height
            );
            fb.fill([0xFF, 0xFF, 0xFF]);
            let pan = unsafe { &mut *PAN_MSG.0.get() };
            *SCREEN.lock() = Some(Screen::new(fb, &board.mailbox, pan));
        }
        Err(e) => kprintln!("[video] negotiation failed: {:?}", e),
    }
}

/// Arm the first tick on the period grid and route the compare IRQ.
fn start_ticking(board: &Board) {
    let now = board.timer.counter_low();
    board
        .timer
        .set_compare(config::TIMER_CHANNEL, sched::next_deadline(now, config::TICK_PERIOD_US));
    board.timer.clear_match(config::TIMER_CHANNEL);
    board.interrupts.enable(config::TIMER_IRQ);
}

/// Place the user program in its window. The user table must already be
/// active. Returns the entry point.
fn load_user() -> Result<usize, loader::LoadError> {
    let image = UserImage {
        segments: &[Segment {
            vaddr: config::USER_EXEC_WINDOW.start,
            file_bytes: &IDLE_PROGRAM,
            mem_size: IDLE_PROGRAM.len(),
        }],
        entry: config::USER_EXEC_WINDOW.start,
    };
    unsafe { image.load() }
}

/// Terminal idle: interrupts keep the tick loop alive, nothing else runs.
fn park() -> ! {
    unsafe { armv6::enable_irqs() };
    loop {
        armv6::wait_for_interrupt();
    }
}
