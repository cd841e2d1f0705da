use switchboard_core::ui_bridge::{StateChangeNotice, UiConnector};

/// Prints administrator notices to the terminal.
#[derive(Debug)]
pub struct CliConnector;

impl UiConnector for CliConnector {
    fn name(&self) -> &str {
        "cli"
    }

    /// Prints the notice under its severity, one line per module
    fn handle_notice(&self, notice: &StateChangeNotice) {
        println!("[{}] {}", notice.severity(), notice);
    }
}
