//! BenchFox dual-rail bench supply, panel firmware.
//!
//! Two execution contexts, one core: a 5 ms input tick running on an
//! interrupt-priority executor (encoder decode + button debounce, publishes
//! into [`SharedInputs`]), and the foreground control loop (consumes the
//! published inputs, programs the regulator references over SPI, samples
//! feedback and reports to the panel display). Only the foreground context
//! touches the SPI bus; that invariant must hold if converter access is
//! ever added to the tick context.

#![no_std]
#![no_main]

use defmt::{info, warn};
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32 as stm32;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{self, UartTx};
use embassy_time::{Duration, Ticker, Timer};

use benchfox_control_core::calibration::{
    linear_code_for_mv, pre_reg_code_for_mv, terminal_mv_from_sense,
};
use benchfox_control_core::input::{InputCapture, PanelSample, TICK_PERIOD_MS};
use benchfox_control_core::mcp3204::{self, Mcp3204};
use benchfox_control_core::mcp4922::{Channel as DacChannel, Command as DacCommand, Mcp4922};
use benchfox_control_core::output::OutputControl;
use benchfox_control_core::shared::SharedInputs;

mod display;

/// Firmware version string baked in at build time.
pub const FW_VERSION: &str = env!("BENCHFOX_FW_VERSION");

// Front-panel step sizes and target limits. One detent of the voltage
// encoder moves the output target 100 mV, one detent of the current encoder
// moves the limit setpoint 50 mA.
const VSET_STEP_MV: i32 = 100;
const VSET_DEFAULT_MV: i32 = 5_000;
const VSET_MIN_MV: i32 = 0;
const VSET_MAX_MV: i32 = 10_000;
const ISET_STEP_MA: i32 = 50;
const ISET_DEFAULT_MA: i32 = 1_000;
const ISET_MIN_MA: i32 = 0;
const ISET_MAX_MA: i32 = 3_000;

// Refresh period of the sample/convert/report loop. Input responsiveness is
// governed by the 5 ms tick alone, not by this cadence.
const REFRESH_PERIOD_MS: u64 = 1_000;

// Converter SPI clock: sysclk/4 off the 16 MHz HSI. Both devices share the
// bus and these settings (mode 0, MSB first); only the chip selects differ.
const CONVERTER_SPI_HZ: u32 = 4_000_000;

/// Input state published by the tick context, consumed by the control loop.
static INPUTS: SharedInputs = SharedInputs::new();

/// The 5 ms tick context. `USART2`'s IRQ is unused by any driver here and
/// serves as the software interrupt the executor runs on.
static TICK_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn USART2() {
    TICK_EXECUTOR.on_interrupt()
}

#[embassy_executor::task]
async fn input_tick_task(
    volt_a: Input<'static>,
    volt_b: Input<'static>,
    curr_a: Input<'static>,
    curr_b: Input<'static>,
    button: Input<'static>,
) {
    fn sample(
        volt_a: &Input<'static>,
        volt_b: &Input<'static>,
        curr_a: &Input<'static>,
        curr_b: &Input<'static>,
        button: &Input<'static>,
    ) -> PanelSample {
        PanelSample {
            volt_a_high: volt_a.is_high(),
            volt_b_high: volt_b.is_high(),
            curr_a_high: curr_a.is_high(),
            curr_b_high: curr_b.is_high(),
            // Button is active-low with a pull-up.
            button_pressed: button.is_low(),
        }
    }

    let mut capture = InputCapture::new(sample(&volt_a, &volt_b, &curr_a, &curr_b, &button));
    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
    loop {
        ticker.next().await;
        capture.tick(sample(&volt_a, &volt_b, &curr_a, &curr_b, &button), &INPUTS);
    }
}

/// Program both regulator references. 2× gain spans the full 4.096 V
/// reference range (1 mV/code); `powered` clear parks both channels in
/// shutdown.
fn program_references(
    bus: &mut Spi<'static, Blocking>,
    dac: &mut Mcp4922<Output<'static>>,
    pre_reg_code: u16,
    linear_code: u16,
    powered: bool,
) {
    for (channel, code) in [(DacChannel::A, pre_reg_code), (DacChannel::B, linear_code)] {
        let command = DacCommand::default()
            .channel(channel)
            .double_gain()
            .powered(powered)
            .value(code);
        if let Err(e) = dac.send(bus, command) {
            warn!("DAC {:?} write failed: {:?}", channel, e);
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    // Run from the 16 MHz HSI; nothing here needs more clock and the
    // converter bus divides it straight down to 4 MHz.
    let p = stm32::init(stm32::Config::default());

    info!("BenchFox supply alive; fw {}", FW_VERSION);

    // Converter bus plus per-device chip selects, both idle high.
    let mut spi_cfg = spi::Config::default();
    spi_cfg.frequency = Hertz(CONVERTER_SPI_HZ);
    spi_cfg.mode = spi::MODE_0;
    spi_cfg.bit_order = spi::BitOrder::MsbFirst;
    let mut bus = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_cfg);

    let mut dac = Mcp4922::new(Output::new(p.PB0, Level::High, Speed::VeryHigh));
    let mut adc = Mcp3204::new(Output::new(p.PB1, Level::High, Speed::VeryHigh));

    // Regulator enable and panel LEDs. The indicator is lit while the
    // output is disabled, so it comes up lit.
    let mut regulator_en = Output::new(p.PB2, Level::Low, Speed::Low);
    let mut indicator_led = Output::new(p.PB3, Level::High, Speed::Low);
    let mut heartbeat_led = Output::new(p.PB4, Level::Low, Speed::Low);

    // Power-on self-check blink, kept short.
    for _ in 0..3 {
        heartbeat_led.set_high();
        Timer::after_millis(50).await;
        heartbeat_led.set_low();
        Timer::after_millis(50).await;
    }

    // Front-panel inputs: two quadrature pairs and the active-low button.
    let volt_a = Input::new(p.PA0, Pull::Up);
    let volt_b = Input::new(p.PA1, Pull::Up);
    let curr_a = Input::new(p.PA2, Pull::Up);
    let curr_b = Input::new(p.PA3, Pull::Up);
    let button = Input::new(p.PC13, Pull::Up);

    // Panel display link, TX only.
    let mut uart_cfg = usart::Config::default();
    uart_cfg.baudrate = display::DISPLAY_BAUD;
    let panel_tx: UartTx<'static, Blocking> =
        UartTx::new_blocking(p.USART1, p.PA9, uart_cfg).unwrap();

    if let Err(e) = spawner.spawn(display::display_task(panel_tx)) {
        warn!("failed to spawn display_task: {:?}", e);
    }

    // Input capture runs above the thread-mode executor so a busy control
    // loop can never delay a tick.
    interrupt::USART2.set_priority(Priority::P6);
    let tick_spawner = TICK_EXECUTOR.start(interrupt::USART2);
    if let Err(e) = tick_spawner.spawn(input_tick_task(volt_a, volt_b, curr_a, curr_b, button)) {
        warn!("failed to spawn input_tick_task: {:?}", e);
    }

    // Safe boot state: output disabled, regulator enable low, both DAC
    // channels in shutdown at code 0 until the first enable.
    let mut outputs = OutputControl::new();
    program_references(&mut bus, &mut dac, 0, 0, outputs.is_enabled());

    let mut target_mv: i32 = VSET_DEFAULT_MV;
    let mut target_ma: i32 = ISET_DEFAULT_MA;

    loop {
        // Consume whatever the tick context published since the last cycle.
        if let Some(counter) = INPUTS.take_voltage_position() {
            target_mv =
                (VSET_DEFAULT_MV + counter * VSET_STEP_MV).clamp(VSET_MIN_MV, VSET_MAX_MV);
            info!("voltage target -> {} mV (counter {})", target_mv, counter);
        }
        if let Some(counter) = INPUTS.take_current_position() {
            target_ma =
                (ISET_DEFAULT_MA + counter * ISET_STEP_MA).clamp(ISET_MIN_MA, ISET_MAX_MA);
            info!("current target -> {} mA (counter {})", target_ma, counter);
        }
        if let Some(enabled) = INPUTS.take_output_event() {
            if outputs.apply(enabled) {
                indicator_led.set_level(Level::from(outputs.indicator_lit()));
                regulator_en.set_level(Level::from(outputs.is_enabled()));
                info!(
                    "output {}",
                    if outputs.is_enabled() { "ENABLED" } else { "DISABLED" }
                );
            }
        }

        // Reconvert and program both references; the powered bits and the
        // regulator enable pin are gated together by the output state.
        let pre_reg_code = pre_reg_code_for_mv(target_mv as u32);
        let linear_code = linear_code_for_mv(target_mv as u32);
        program_references(
            &mut bus,
            &mut dac,
            pre_reg_code,
            linear_code,
            outputs.is_enabled(),
        );

        // Sample all four feedback channels; channel 1 carries the terminal
        // voltage through the R34/R35 divider.
        let mut raw = [0u16; 4];
        for channel in mcp3204::Channel::ALL {
            match adc.read(&mut bus, channel) {
                Ok(code) => raw[channel.index() as usize] = code,
                Err(e) => warn!("ADC ch{} read failed: {:?}", channel.index(), e),
            }
        }
        let terminal_mv = terminal_mv_from_sense(raw[1]);

        heartbeat_led.toggle();
        display::report(target_mv as u32, target_ma as u32, terminal_mv);
        info!(
            "terminal {} mV (raw {}), targets {} mV / {} mA, codes A={} B={}",
            terminal_mv, raw[1], target_mv, target_ma, pre_reg_code, linear_code
        );

        Timer::after_millis(REFRESH_PERIOD_MS).await;
    }
}
