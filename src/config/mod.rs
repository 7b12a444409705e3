mod settings;

pub use settings::{save_setting, Config, EXAMPLE_CONFIG, SETTABLE_KEYS};
