mod button;
mod status_log;

pub use button::{ButtonEvents, bind_button, button_events};
pub use status_log::LogStatusDisplay;
