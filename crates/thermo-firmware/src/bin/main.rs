#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use alloc::format;

use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay as BusyDelay;
use esp_hal::gpio::{DriveMode, Flex, Level, Output, OutputConfig, Pull};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use static_cell::StaticCell;

// Display-LCD panel specific imports
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use thermo_core::app_state::{AppState, SharedState};
use thermo_core::buttons::{ButtonChannel, LogicalButton};
use thermo_core::config::Config;
use thermo_core::control::DeviceLoop;
use thermo_core::display::{BufferedDisplay, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use thermo_core::pages::render_error_message;
use thermo_core::sensors::{BitBangOneWire, Ds18b20Reader};
use thermo_firmware::buttons::{button_input, button_task};
use thermo_firmware::clock::EmbassyClock;
use thermo_firmware::panel::LcdPanel;

extern crate alloc;

/// Device config embedded by build.rs.
const DEVICE_CONFIG: &str = include_str!(env!("THERMO_CONFIG_PATH"));

static STATE: SharedState = SharedState::new(AppState::boot(0));
static BUTTON_EVENTS: ButtonChannel = ButtonChannel::new();
static SPI_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    // Fixed low clock; the display is the main consumer and polling is slow.
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::_80MHz);
    let peripherals = esp_hal::init(config);

    // The framebuffer alone is 150 KiB, more than the reclaimed region holds.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);
    esp_alloc::heap_allocator!(size: 160 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized, radios left off");

    // Display: SPI2, software CS, DC line, GPIO backlight
    let spi_bus = Spi::new(
        peripherals.SPI2,
        SpiConfig::default().with_frequency(Rate::from_mhz(40)),
    )
    .expect("Failed to configure SPI")
    .with_sck(peripherals.GPIO36)
    .with_mosi(peripherals.GPIO37);

    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new_no_delay(spi_bus, cs).expect("Failed to wrap SPI device");
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());

    let di = SpiInterface::new(spi_device, dc, SPI_BUFFER.init([0u8; 512]));
    let lcd = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
        .init(&mut Delay)
        .expect("Failed to initialize display");

    let backlight = Output::new(peripherals.GPIO38, Level::Low, OutputConfig::default());
    let mut display = BufferedDisplay::new(LcdPanel::new(lcd, backlight));

    info!("Display initialized");

    let config = match Config::from_json(DEVICE_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid config.json: {}", e);
            render_error_message(&mut display, &format!("Invalid config: {}", e));
            loop {
                Timer::after(Duration::from_secs(60)).await;
            }
        }
    };

    // DS18B20 probes on an open-drain one-wire line with an external pull-up
    let mut onewire_pin = Flex::new(peripherals.GPIO4);
    onewire_pin.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    onewire_pin.set_input_enable(true);
    onewire_pin.set_output_enable(true);
    onewire_pin.set_high();
    let reader = Ds18b20Reader::new(BitBangOneWire::new(onewire_pin, BusyDelay::new()), Delay);

    // Buttons
    spawner
        .spawn(button_task(
            button_input(peripherals.GPIO5),
            LogicalButton::TopLeft,
            BUTTON_EVENTS.sender(),
        ))
        .unwrap();
    spawner
        .spawn(button_task(
            button_input(peripherals.GPIO6),
            LogicalButton::TopRight,
            BUTTON_EVENTS.sender(),
        ))
        .unwrap();
    spawner
        .spawn(button_task(
            button_input(peripherals.GPIO7),
            LogicalButton::BottomLeft,
            BUTTON_EVENTS.sender(),
        ))
        .unwrap();
    spawner
        .spawn(button_task(
            button_input(peripherals.GPIO15),
            LogicalButton::BottomRight,
            BUTTON_EVENTS.sender(),
        ))
        .unwrap();

    let mut device = DeviceLoop::new(&STATE, BUTTON_EVENTS.receiver(), display, reader, config);
    device.run(&EmbassyClock, &mut Delay).await;

    unreachable!("control loop returned")
}
