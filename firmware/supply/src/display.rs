//! Panel display link.
//!
//! The front-panel display module renders whatever text it is handed; this
//! side only formats plain numbers. Two newline-terminated lines per
//! refresh: line 1 carries the setpoints (`<mV> <mA>`), line 2 the measured
//! terminal millivolts. There is no feedback path from the display.

use core::fmt::Write as _;

use defmt::warn;
use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::UartTx;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

pub const DISPLAY_BAUD: u32 = 115_200;

const LINE_CAPACITY: usize = 16;

pub struct ReportFrame {
    pub line1: String<LINE_CAPACITY>,
    pub line2: String<LINE_CAPACITY>,
}

/// Control loop → display task. One slot of headroom is enough: a frame is
/// produced once per refresh cycle and writing two short lines at
/// 115200 baud takes about a millisecond.
static REPORT_CH: Channel<CriticalSectionRawMutex, ReportFrame, 2> = Channel::new();

/// Format the cycle's values and queue them for the display. A full queue
/// drops the frame; the next refresh resends current values anyway.
pub fn report(target_mv: u32, target_ma: u32, terminal_mv: u32) {
    let mut line1: String<LINE_CAPACITY> = String::new();
    let mut line2: String<LINE_CAPACITY> = String::new();
    let _ = write!(line1, "{} {}", target_mv, target_ma);
    let _ = write!(line2, "{}", terminal_mv);
    let _ = REPORT_CH.try_send(ReportFrame { line1, line2 });
}

#[embassy_executor::task]
pub async fn display_task(mut panel: UartTx<'static, Blocking>) {
    loop {
        let frame = REPORT_CH.receive().await;
        for line in [&frame.line1, &frame.line2] {
            if let Err(e) = panel
                .blocking_write(line.as_bytes())
                .and_then(|_| panel.blocking_write(b"\n"))
            {
                warn!("panel display write failed: {:?}", e);
            }
        }
        let _ = panel.blocking_flush();
    }
}
