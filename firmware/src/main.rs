#![no_std]
#![no_main]

use panic_halt as _;

mod clock;
mod serial;

#[rtic::app(device = stm32f4xx_hal::pac, peripherals = true)]
mod app {
    use cortex_m::delay::Delay;
    use presence_core::{
        config::Config, control::ControlLoop, distance_sensor::Hcsr04, relay::Relay,
        serial::SerialReporter,
    };
    use rtt_target::{rprintln, rtt_init_print};
    use stm32f4xx_hal::{
        gpio::{gpiob, Input, Output, PinState, PushPull},
        otg_fs::{UsbBus, UsbBusType, USB},
        prelude::*,
    };
    use usb_device::{bus::UsbBusAllocator, prelude::*};
    use usbd_serial::SerialPort;

    use crate::{
        clock::CycleCounter,
        serial::{SerialPortType, SerialWriter, SERIAL_READ_BUFFER_BYTES, SERIAL_WRITE_BUFFER_BYTES},
    };

    // Number of samples in the debouncing window
    const WINDOW_SIZE: usize = 20;
    const CONFIG: Config = Config::DEFAULT;

    type Sensor = Hcsr04<
        gpiob::PB12<Output<PushPull>>,
        gpiob::PB13<Input>,
        CycleCounter,
        CycleCounter,
    >;
    type PowerRelay = Relay<gpiob::PB14<Output<PushPull>>>;

    #[shared]
    struct Shared {
        usb_dev: UsbDevice<'static, UsbBusType>,
        serial: SerialPortType,
    }

    #[local]
    struct Local {
        sensor: Sensor,
        relay: PowerRelay,
        delay: Delay,
    }

    #[init(local = [
        ep_memory: [u32; 1024] = [0; 1024],
        usb_bus: Option<UsbBusAllocator<UsbBusType>> = None,
    ])]
    fn init(mut ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        rtt_init_print!();

        rprintln!("Initializing");

        // Clock setup. USB needs the 48 MHz PLL output.
        let rcc = ctx.device.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(25.MHz())
            .sysclk(48.MHz())
            .require_pll48clk()
            .freeze();

        // The cycle counter times the echo pulses
        ctx.core.DCB.enable_trace();
        ctx.core.DWT.enable_cycle_counter();
        let cycles = CycleCounter::new(clocks.sysclk().to_Hz());
        let delay = Delay::new(ctx.core.SYST, clocks.sysclk().to_Hz());

        rprintln!("Clock setup done");

        // GPIO setup
        let gpioa = ctx.device.GPIOA.split();
        let gpiob = ctx.device.GPIOB.split();

        // HC-SR04. The echo pin is 5V tolerant.
        let trig = gpiob.pb12.into_push_pull_output();
        let echo = gpiob.pb13.into_floating_input();
        let sensor = Hcsr04::new(trig, echo, cycles, cycles);

        // The relay module is active low, start with the relay released
        let relay = Relay::active_low(gpiob.pb14.into_push_pull_output_in_state(PinState::High));

        rprintln!("GPIO setup done");

        // USB serial for the status reports
        let usb = USB {
            usb_global: ctx.device.OTG_FS_GLOBAL,
            usb_device: ctx.device.OTG_FS_DEVICE,
            usb_pwrclk: ctx.device.OTG_FS_PWRCLK,
            pin_dm: gpioa.pa11.into_alternate(),
            pin_dp: gpioa.pa12.into_alternate(),
            hclk: clocks.hclk(),
        };
        let usb_bus = ctx
            .local
            .usb_bus
            .insert(UsbBus::new(usb, ctx.local.ep_memory));
        let serial = SerialPort::new_with_store(
            usb_bus,
            [0; SERIAL_READ_BUFFER_BYTES],
            [0; SERIAL_WRITE_BUFFER_BYTES],
        );
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x16c0, 0x27dd))
            .manufacturer("Presence Switch")
            .product("Presence Switch")
            .serial_number("0001")
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        rprintln!("USB setup done");

        (
            Shared { usb_dev, serial },
            Local {
                sensor,
                relay,
                delay,
            },
            init::Monotonics(),
        )
    }

    #[idle(local = [sensor, relay, delay], shared = [serial])]
    fn idle(ctx: idle::Context) -> ! {
        let reporter = SerialReporter::new(SerialWriter(ctx.shared.serial));
        let control = ControlLoop::<_, _, _, WINDOW_SIZE>::new(
            CONFIG,
            ctx.local.sensor,
            ctx.local.relay,
            reporter,
        );
        let mut control = match control {
            Ok(control) => control,
            Err(e) => {
                rprintln!("Invalid configuration: {}", e.as_str());
                loop {
                    cortex_m::asm::wfi();
                }
            }
        };

        rprintln!(
            "Starting control loop, one sample every {} ms",
            control.sample_period_ms()
        );
        control.run(ctx.local.delay, |e| rprintln!("Error: {}", e.as_str()))
    }

    #[task(binds = OTG_FS, shared = [usb_dev, serial])]
    fn usb_poll(ctx: usb_poll::Context) {
        (ctx.shared.usb_dev, ctx.shared.serial).lock(|usb_dev, serial| {
            if usb_dev.poll(&mut [serial]) {
                // Nothing is read from the host, drop incoming data
                let mut buf = [0u8; SERIAL_READ_BUFFER_BYTES];
                serial.read(&mut buf).ok();
            }
        });
    }
}
