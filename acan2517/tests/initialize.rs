mod common;

use std::sync::Arc;
use acan2517::constants::*;
use acan2517::*;
use common::{polled, small_fifos, MockGpio, SimBus};

#[test]
fn test_initialize() -> anyhow::Result<()> {
    let bus = SimBus::default();
    let driver = Acan2517::new(bus.clone(), NO_INT_PIN, NoGpio);
    driver.initialize_pass_all(&small_fifos(), None).into_result()?;

    let chip = bus.chip();
    assert_eq!(chip.violations, 0);
    assert_eq!(chip.resets, 1);
    assert_eq!(chip.clock_history, vec![1_000_000, 20_000_000]);
    assert_eq!(chip.mode_requests, vec![4, 6]);
    assert_eq!(chip.opmod(), 6);

    // CLKO divided by 10, no PLL
    assert_eq!(chip.byte(OSC_REGISTER), 0x60);
    assert_eq!(chip.byte(IOCON_REGISTER + 3), 0x03);
    assert_eq!(chip.byte(C1CON_REGISTER + 2) & 0x1F, 0x00);
    assert_eq!(chip.word(C1NBTCFG_REGISTER), 0x001E_0707);

    assert_eq!(chip.byte(C1TXQCON_REGISTER + 2), 0x60);
    assert_eq!(chip.byte(C1TXQCON_REGISTER + 3), 0x00);
    assert_eq!(chip.byte(c1fifocon_register(1)), 0x01);
    assert_eq!(chip.byte(c1fifocon_register(1) + 3), 0x03);
    assert_eq!(chip.byte(c1fifocon_register(2)), 0x80);
    assert_eq!(chip.byte(c1fifocon_register(2) + 2), 0x60);
    assert_eq!(chip.byte(c1fifocon_register(2) + 3), 0x03);

    assert_eq!(chip.word(c1mask_register(0)), 0);
    assert_eq!(chip.word(c1fltobj_register(0)), 0);
    assert_eq!(chip.byte(c1fltcon_register(0)), 0x81);
    assert_eq!(chip.byte(c1fltcon_register(1)), 0x00);

    assert_eq!(chip.byte(C1INT_REGISTER + 2), 0x03);
    assert_eq!(chip.byte(C1INT_REGISTER + 3), 0x00);
    drop(chip);

    assert_eq!(driver.transmit_buffer_size(), 16);
    assert_eq!(driver.receive_buffer_size(), 32);
    assert!(!driver.available());

    Ok(())
}

#[test]
fn test_initialize_txq_pll_and_pins() -> anyhow::Result<()> {
    let bus = SimBus::default();
    let driver = polled(&bus);
    let mut settings = small_fifos();
    settings.set_oscillator(Oscillator::Osc4MHz10xPll)
        .set_clko_pin(ClkoPin::StartOfFrame)
        .set_txcan_open_drain(true)
        .set_int_open_drain(true)
        .set_controller_txq(4, 7, RetransmissionAttempts::Three)
        .set_requested_mode(RequestedMode::InternalLoopback);
    driver.initialize_pass_all(&settings, None).into_result()?;

    let chip = bus.chip();
    assert_eq!(chip.byte(OSC_REGISTER), 0x01);
    assert_eq!(chip.byte(IOCON_REGISTER + 3), 0x73);
    assert_eq!(chip.byte(C1TXQCON_REGISTER + 2), 0x27);
    assert_eq!(chip.byte(C1TXQCON_REGISTER + 3), 0x03);
    assert_eq!(chip.byte(C1CON_REGISTER + 2) & 0x1F, 0x10);
    assert_eq!(chip.clock_history, vec![1_000_000, 20_000_000]);
    assert_eq!(chip.opmod(), 2);

    Ok(())
}

#[test]
fn test_reinitialize() -> anyhow::Result<()> {
    let bus = SimBus::default();
    let driver = polled(&bus);
    driver.initialize_pass_all(&small_fifos(), None).into_result()?;

    let mut settings = small_fifos();
    settings.set_driver_receive_buffer_size(8);
    driver.initialize_pass_all(&settings, None).into_result()?;
    assert_eq!(bus.chip().resets, 2);
    assert_eq!(driver.receive_buffer_size(), 8);

    Ok(())
}

#[test]
fn test_single_violation() -> anyhow::Result<()> {
    let bus = SimBus::default();
    let driver = polled(&bus);

    let mut settings = small_fifos();
    settings.set_bit_timing(BitTiming::default(), false);
    assert_eq!(
        driver.initialize_pass_all(&settings, None),
        ErrorCode::TOO_FAR_FROM_DESIRED_BIT_RATE
    );

    let mut settings = small_fifos();
    settings.set_bit_timing(BitTiming::new(1, 31, 8, 9), true);
    assert_eq!(
        driver.initialize_pass_all(&settings, None),
        ErrorCode::INCONSISTENT_BIT_RATE_SETTINGS
    );

    let mut filters = Filters::new();
    filters.append_frame_filter(FrameFormat::Standard, 0x800, None);
    assert_eq!(
        driver.initialize(&small_fifos(), None, &filters),
        ErrorCode::FILTER_DEFINITION_ERROR
    );

    let handler: IsrHandler = Arc::new(|| {});
    assert_eq!(
        driver.initialize_pass_all(&small_fifos(), Some(handler)),
        ErrorCode::ISR_NOT_NULL_AND_NO_INT_PIN
    );

    // nothing reaches the controller
    assert_eq!(bus.chip().exchanges, 0);
    assert!(bus.chip().clock_history.is_empty());

    Ok(())
}

#[test]
fn test_multiple_violations() -> anyhow::Result<()> {
    let bus = SimBus::default();
    let driver = polled(&bus);

    let mut settings = small_fifos();
    settings.set_controller_receive_fifo_size(0);
    let mut filters = Filters::new();
    (0..40).for_each(|_| { filters.append_pass_all(None); });
    assert_eq!(
        driver.initialize(&settings, None, &filters),
        ErrorCode::CONTROLLER_RECEIVE_FIFO_SIZE_IS_ZERO | ErrorCode::MORE_THAN_32_FILTERS
    );

    let mut settings = small_fifos();
    settings.set_controller_txq(33, 32, RetransmissionAttempts::Disabled)
        .set_controller_receive_fifo_size(33)
        .set_controller_transmit_fifo(0, 40, RetransmissionAttempts::Disabled);
    assert_eq!(
        driver.initialize_pass_all(&settings, None),
        ErrorCode::CONTROLLER_TXQ_SIZE_GREATER_THAN_32
            | ErrorCode::CONTROLLER_TXQ_PRIORITY_GREATER_THAN_31
            | ErrorCode::CONTROLLER_RECEIVE_FIFO_SIZE_GREATER_THAN_32
            | ErrorCode::CONTROLLER_TRANSMIT_FIFO_SIZE_IS_ZERO
            | ErrorCode::CONTROLLER_TRANSMIT_FIFO_PRIORITY_GREATER_THAN_31
    );

    let mut settings = small_fifos();
    settings.set_controller_txq(32, 0, RetransmissionAttempts::Disabled)
        .set_controller_receive_fifo_size(100)
        .set_controller_transmit_fifo(32, 0, RetransmissionAttempts::Disabled);
    assert_eq!(
        driver.initialize_pass_all(&settings, None),
        ErrorCode::CONTROLLER_RECEIVE_FIFO_SIZE_GREATER_THAN_32
            | ErrorCode::CONTROLLER_RAM_USAGE_GREATER_THAN_2048
    );

    assert_eq!(bus.chip().exchanges, 0);

    Ok(())
}

#[test]
fn test_interrupt_pin() -> anyhow::Result<()> {
    let bus = SimBus::default();
    let mut builder = Acan2517::builder(bus.clone());
    builder.set_interrupt_pin(7, MockGpio::default())
        .set_clock(common::TickClock::default());
    let driver = builder.build();
    assert_eq!(
        driver.initialize_pass_all(&small_fifos(), None),
        ErrorCode::INT_PIN_IS_NOT_AN_INTERRUPT | ErrorCode::ISR_IS_NULL
    );

    let gpio = MockGpio::with_interrupt(3);
    let mut builder = Acan2517::builder(bus.clone());
    builder.set_interrupt_pin(7, gpio.clone())
        .set_clock(common::TickClock::default());
    let driver = builder.build();
    driver.initialize_pass_all(&small_fifos(), Some(driver.interrupt_handler())).into_result()?;
    {
        let state = gpio.state();
        assert_eq!(state.pullups, vec![7]);
        assert_eq!(state.attached, vec![(3, Trigger::LowLevel)]);
    }

    let frame = CanMessage::new(0x321u32, &[0x01])
        .ok_or(anyhow::anyhow!("invalid frame"))?;
    assert!(bus.chip().inject(&frame));
    gpio.fire();
    assert_eq!(driver.receive().map(|f| f.raw_id()), Some(0x321));

    Ok(())
}

#[test]
fn test_configuration_mode_timeout() -> anyhow::Result<()> {
    let bus = SimBus::default();
    bus.chip().lock_mode(6);
    let driver = polled(&bus);
    assert_eq!(
        driver.initialize_pass_all(&small_fifos(), None),
        ErrorCode::REQUESTED_CONFIGURATION_MODE_TIMEOUT
    );

    let chip = bus.chip();
    assert_eq!(chip.resets, 1);
    assert_eq!(chip.mode_requests, vec![4]);
    assert_eq!(chip.clock_history, vec![1_000_000]);
    drop(chip);

    let frame = CanMessage::new(0x10u32, &[])
        .ok_or(anyhow::anyhow!("invalid frame"))?;
    assert!(!driver.try_send(&frame));

    Ok(())
}

#[test]
fn test_pll_timeout() -> anyhow::Result<()> {
    let bus = SimBus::default();
    bus.chip().pll_broken = true;
    let driver = polled(&bus);
    let mut settings = small_fifos();
    settings.set_oscillator(Oscillator::Osc4MHz10xPllDividedBy2);
    assert_eq!(driver.initialize_pass_all(&settings, None), ErrorCode::X10_PLL_NOT_READY);
    assert_eq!(bus.chip().mode_requests, vec![4]);

    // no PLL, no wait
    let mut settings = small_fifos();
    settings.set_oscillator(Oscillator::Osc20MHz);
    driver.initialize_pass_all(&settings, None).into_result()?;
    assert_eq!(bus.chip().clock_history.last(), Some(&10_000_000));

    Ok(())
}

#[test]
fn test_requested_mode_timeout() -> anyhow::Result<()> {
    let bus = SimBus::default();
    bus.chip().lock_mode(4);
    let driver = polled(&bus);
    assert_eq!(driver.initialize_pass_all(&small_fifos(), None), ErrorCode::REQUESTED_MODE_TIMEOUT);
    assert_eq!(bus.chip().mode_requests, vec![4, 6]);

    let frame = CanMessage::new(0x10u32, &[])
        .ok_or(anyhow::anyhow!("invalid frame"))?;
    assert!(!driver.try_send(&frame));
    assert!(!driver.poll());

    Ok(())
}

#[test]
fn test_read_back_errors() -> anyhow::Result<()> {
    let bus = SimBus::default();
    bus.chip().max_clock = Some(500_000);
    let driver = polled(&bus);
    assert_eq!(
        driver.initialize_pass_all(&small_fifos(), None),
        ErrorCode::READ_BACK_ERROR_WITH_1MHZ_SPI_CLOCK
    );
    assert_eq!(bus.chip().clock_history, vec![1_000_000]);

    let bus = SimBus::default();
    bus.chip().max_clock = Some(10_000_000);
    let driver = polled(&bus);
    assert_eq!(
        driver.initialize_pass_all(&small_fifos(), None),
        ErrorCode::READ_BACK_ERROR_WITH_FULL_SPEED_SPI_CLOCK
    );
    assert_eq!(bus.chip().clock_history, vec![1_000_000, 20_000_000]);
    assert_eq!(bus.chip().mode_requests, vec![4]);

    Ok(())
}

#[test]
fn test_error_code() -> anyhow::Result<()> {
    assert_eq!(ErrorCode::empty().to_string(), "no error");
    assert!(ErrorCode::empty().into_result().is_ok());

    let code = ErrorCode::ISR_IS_NULL | ErrorCode::MORE_THAN_32_FILTERS;
    assert_eq!(code.to_string(), "ISR_IS_NULL | MORE_THAN_32_FILTERS");
    assert_eq!(
        code.into_result(),
        Err(CanError::DeviceConfigError("ISR_IS_NULL | MORE_THAN_32_FILTERS".into()))
    );

    Ok(())
}
