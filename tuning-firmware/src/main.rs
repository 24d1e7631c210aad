#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(feature = "std"), no_main)]

mod error;
mod flags;
mod global;
mod trace;

#[cfg(feature = "sim")]
mod sim;

#[cfg(feature = "sim")]
fn main() {
    sim::run_demo();
}

#[cfg(all(feature = "hardware", not(feature = "sim")))]
use panic_halt as _;

#[cfg(all(feature = "hardware", not(feature = "sim")))]
#[global_allocator]
static ALLOCATOR: alloc_cortex_m::CortexMHeap = alloc_cortex_m::CortexMHeap::empty();

#[cfg(all(feature = "hardware", not(feature = "sim")))]
const HEAP_SIZE: usize = 1024;

#[cfg(all(feature = "hardware", not(feature = "sim")))]
fn go() -> error::Result<()> {
    unsafe { ALLOCATOR.init(cortex_m_rt::heap_start() as usize, HEAP_SIZE) }

    compile_error!(
        "tuning-firmware ships no board of its own: implement tuning_hal::{Radio, Timer, Trace} \
         for your hardware, install a tuning_hal::BareMetalDriver into a global::GlobalDriver \
         static, and set flags::FLAGS bits from your interrupt handlers. Then call go() from your \
         own cortex_m_rt::entry"
    )
}

#[cfg(all(feature = "hardware", not(feature = "sim")))]
#[cortex_m_rt::entry]
fn main() -> ! {
    match go() {
        Ok(()) => loop {
            cortex_m::asm::wfi();
        },
        Err(_) => cortex_m::peripheral::SCB::sys_reset(),
    }
}
