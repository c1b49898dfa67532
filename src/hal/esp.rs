//! ESP32 board: GPIO contacts, LEDC sidetone, ADC selector, UDP over Wi-Fi.

use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, Input, Output, PinDriver, Pull};
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, CHANNEL0, TIMER0};
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::sys::{self, EspError};

use super::gpio::PINS;
use super::udp::UdpLink;
use super::{selector_band, Clock, Contact, Contacts, Keying, Transport, TransportError};
use crate::config::TONE_DEFAULT_HZ;

#[cfg(not(feature = "esp32p4"))]
pub type SelectorPin = esp_idf_svc::hal::gpio::Gpio1;
#[cfg(feature = "esp32p4")]
pub type SelectorPin = esp_idf_svc::hal::gpio::Gpio16;

type Selector = AdcChannelDriver<'static, SelectorPin, AdcDriver<'static, ADC1>>;

/// LEDC peripherals and pins the board takes ownership of.
pub struct EspParts {
    pub timer: TIMER0,
    pub channel: CHANNEL0,
    pub adc: ADC1,
    pub selector: SelectorPin,
}

pub struct EspBoard {
    dit: PinDriver<'static, AnyIOPin, Input>,
    dah: PinDriver<'static, AnyIOPin, Input>,
    setup: PinDriver<'static, AnyIOPin, Input>,
    key: PinDriver<'static, AnyIOPin, Output>,
    status: PinDriver<'static, AnyIOPin, Output>,
    tone: LedcDriver<'static>,
    selector: Selector,
    link: UdpLink,
}

fn input(pin: i32) -> Result<PinDriver<'static, AnyIOPin, Input>, EspError> {
    // SAFETY: pin numbers come from the board map and are used once
    let mut driver = PinDriver::input(unsafe { AnyIOPin::new(pin) })?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

fn output(pin: i32) -> Result<PinDriver<'static, AnyIOPin, Output>, EspError> {
    // SAFETY: as above
    let mut driver = PinDriver::output(unsafe { AnyIOPin::new(pin) })?;
    driver.set_low()?;
    Ok(driver)
}

impl EspBoard {
    pub fn new(parts: EspParts, link: UdpLink) -> Result<Self, EspError> {
        let timer = LedcTimerDriver::new(
            parts.timer,
            &TimerConfig::new().frequency(u32::from(TONE_DEFAULT_HZ).Hz()),
        )?;
        // SAFETY: speaker pin is not used elsewhere
        let speaker = unsafe { AnyIOPin::new(PINS.speaker) };
        let mut tone = LedcDriver::new(parts.channel, timer, speaker)?;
        tone.set_duty(0)?;

        let adc = AdcDriver::new(parts.adc)?;
        let config = AdcChannelConfig { attenuation: DB_11, ..Default::default() };
        let selector = AdcChannelDriver::new(adc, parts.selector, &config)?;

        let mut board = Self {
            dit: input(PINS.paddles.dit_pin)?,
            dah: input(PINS.paddles.dah_pin)?,
            setup: input(PINS.paddles.setup_pin)?,
            key: output(PINS.tx.pin)?,
            status: output(PINS.status_led)?,
            tone,
            selector,
            link,
        };
        board.set_key(false);
        Ok(board)
    }

    pub fn set_link(&mut self, link: UdpLink) {
        self.link = link;
    }
}

impl Contacts for EspBoard {
    fn is_closed(&mut self, contact: Contact) -> bool {
        let pin = match contact {
            Contact::Dit => &self.dit,
            Contact::Dah => &self.dah,
            Contact::Setup => &self.setup,
        };
        PINS.paddles.closed(pin.is_high())
    }

    fn selector(&mut self) -> u8 {
        // 12-bit raw reading, bands are defined on 10 bits
        self.selector.read_raw().map(|raw| selector_band(raw >> 2)).unwrap_or(0)
    }
}

impl Keying for EspBoard {
    fn start_tone(&mut self, hz: u16) {
        // SAFETY: timer 0 was configured by the `LedcTimerDriver` now owned by
        // `self.tone`; only its frequency register changes here.
        unsafe {
            sys::ledc_set_freq(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, sys::ledc_timer_t_LEDC_TIMER_0, u32::from(hz));
        }
        let half = self.tone.get_max_duty() / 2;
        let _ = self.tone.set_duty(half);
    }

    fn stop_tone(&mut self) {
        let _ = self.tone.set_duty(0);
    }

    fn set_key(&mut self, down: bool) {
        let _ = if PINS.tx.level(down) { self.key.set_high() } else { self.key.set_low() };
    }

    fn set_status(&mut self, on: bool) {
        let _ = if on { self.status.set_high() } else { self.status.set_low() };
    }
}

impl Clock for EspBoard {
    fn now_ms(&self) -> u64 {
        (unsafe { sys::esp_timer_get_time() } / 1000) as u64
    }

    fn relax(&mut self) {
        // One tick at CONFIG_FREERTOS_HZ=1000; keeps the idle task fed
        FreeRtos::delay_ms(1);
    }
}

impl Transport for EspBoard {
    fn send(&mut self, datagram: &[u8; 8]) -> Result<(), TransportError> {
        self.link.send(datagram)
    }

    fn try_receive(&mut self) -> Option<[u8; 8]> {
        self.link.try_receive()
    }
}
