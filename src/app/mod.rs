mod navigator;
mod state;
mod viewport;

pub use state::{App, InputMode};
