use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::{Duration, Instant};
use esp_hal::{
    gpio::{Event, Input, InputConfig, InputPin, Io, Pull},
    handler,
    peripherals,
    ram,
};

use playalights_sync::ButtonEvent;

use crate::infrastructure::config;

const EVENT_QUEUE_DEPTH: usize = 4;

pub type ButtonEvents = Receiver<'static, CriticalSectionRawMutex, ButtonEvent, EVENT_QUEUE_DEPTH>;

/// Button input pin
static BUTTON: Mutex<CriticalSectionRawMutex, RefCell<Option<Input>>> =
    Mutex::new(RefCell::new(None));

/// When the current press started
static PRESSED_AT: Mutex<CriticalSectionRawMutex, Cell<Option<Instant>>> =
    Mutex::new(Cell::new(None));

/// Classified presses waiting for the node task
static EVENTS: Channel<CriticalSectionRawMutex, ButtonEvent, EVENT_QUEUE_DEPTH> = Channel::new();

/// Bind the user button to the system
///
/// The button is active low. Both edges are observed; a press is classified
/// as short or long when it is released.
pub fn bind_button(mux: peripherals::IO_MUX<'static>, pin: impl InputPin + 'static) {
    let mut io = Io::new(mux);
    io.set_interrupt_handler(handle_button_edge);

    // GPIO34-39 have no internal pull resistors; the board pulls up
    let config = InputConfig::default().with_pull(Pull::None);
    let mut button = Input::new(pin, config);
    button.listen(Event::AnyEdge);

    BUTTON.lock(|cell| {
        cell.borrow_mut().replace(button);
    });
}

/// Receiver of classified button presses
pub fn button_events() -> ButtonEvents {
    EVENTS.receiver()
}

fn classify(held: Duration) -> Option<ButtonEvent> {
    if held < Duration::from_millis(config::BUTTON.debounce_ms) {
        None
    } else if held >= Duration::from_millis(config::BUTTON.long_press_ms) {
        Some(ButtonEvent::LongPress)
    } else {
        Some(ButtonEvent::ShortPress)
    }
}

/// Handler for button edges
#[handler]
#[ram]
fn handle_button_edge() {
    let pressed = BUTTON.lock(|cell| {
        let mut cell = cell.borrow_mut();
        let button = cell.as_mut()?;
        if !button.is_interrupt_set() {
            return None;
        }
        button.clear_interrupt();
        Some(button.is_low())
    });

    let Some(pressed) = pressed else {
        return;
    };

    let now = Instant::now();
    if pressed {
        PRESSED_AT.lock(|cell| cell.set(Some(now)));
        return;
    }

    let Some(since) = PRESSED_AT.lock(Cell::take) else {
        return;
    };
    if let Some(event) = classify(now.saturating_duration_since(since)) {
        // A full queue drops the press; the node task drains it every tick
        let _ = EVENTS.try_send(event);
        let _ = EVENTS.try_send(ButtonEvent::Released);
    }
}
