#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod bare {
    use core::arch::global_asm;

    // Kernel entry point.
    //
    // The firmware loads us at 0x8000 and jumps to _start in supervisor
    // mode. Each banked trap mode needs its own stack before any trap can
    // be taken, so they are carved out of the low memory below the load
    // address. BSS is cleared here because nothing before us does it.
    global_asm!(
        ".section .text._start",
        ".global _start",
        "_start:",
        // Banked stacks: UND, ABT, IRQ, then back to SVC for boot.
        "    cps #0x1b", // undefined mode
        "    ldr sp, =0x6000",
        "    cps #0x17", // abort mode
        "    ldr sp, =0x6800",
        "    cps #0x12", // irq mode
        "    ldr sp, =0x7000",
        "    cps #0x13", // supervisor mode
        "    ldr sp, =0x8000",
        // Zero BSS
        "    ldr r0, =__bss_start",
        "    ldr r1, =__bss_end",
        "    mov r2, #0",
        "1:",
        "    cmp r0, r1",
        "    bhs 2f",
        "    str r2, [r0], #4",
        "    b 1b",
        "2:",
        "    b {kernel_entry}",
        kernel_entry = sym tangram_kernel::boot::kernel_entry,
    );

    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        tangram_kernel::arch::armv6::exception::panic_halt(info)
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
