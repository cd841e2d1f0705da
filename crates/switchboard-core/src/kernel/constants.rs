/// Framework name
pub const FRAMEWORK_NAME: &str = "Switchboard";

/// Framework version
pub const FRAMEWORK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default option store file used by the command-line driver
pub const DEFAULT_STORE_FILE: &str = "switchboard-options.json";
