//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common error scenarios.

use std::fmt::Write;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "════════════════════════ ERROR ════════════════════════"
    )
    .ok();
    writeln!(&mut output).ok();

    let error_msg = error.to_string();

    if error_msg.contains("Connection") || error_msg.contains("connect") {
        format_connection_error(&mut output);
    } else if error_msg.contains("transfer") || error_msg.contains("data file") {
        format_transfer_error(&mut output);
    } else if error_msg.contains("display") || error_msg.contains("surface") {
        format_display_error(&mut output);
    } else if error_msg.contains("config") {
        format_config_error(&mut output);
    } else if error_msg.contains("already active") {
        format_session_error(&mut output);
    } else {
        writeln!(&mut output, "Recording Error").ok();
        writeln!(&mut output).ok();
        writeln!(&mut output, "Error: {}", error_msg).ok();
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "───────────────────────────────────────────────────────"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "Run with -vv for detailed logs: gazetrack -vv track").ok();

    output
}

fn format_connection_error(output: &mut String) {
    writeln!(output, "Tracker Connection Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not reach the tracker host computer.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Wrong host address").ok();
    writeln!(output, "     → Check device.host in the config file").ok();
    writeln!(output, "     → The default tracker address is 100.1.1.1").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Ethernet link down").ok();
    writeln!(output, "     → Check the cable between both computers").ok();
    writeln!(output, "     → Try: ping <host address>").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Tracker host software not running").ok();
    writeln!(output, "     → Start the host application on the tracker PC").ok();
    writeln!(output).ok();
    writeln!(output, "  4. No device at hand").ok();
    writeln!(output, "     → Omit device.host to use the simulated device").ok();
}

fn format_transfer_error(output: &mut String) {
    writeln!(output, "Data File Transfer Error").ok();
    writeln!(output).ok();
    writeln!(output, "The recording could not be retrieved from the tracker.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Output directory not writable").ok();
    writeln!(output, "     → Check permissions on the output directory").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Connection dropped mid-transfer").ok();
    writeln!(output, "     → The file may still exist on the tracker host").ok();
    writeln!(output, "     → It can be copied manually from the host PC").ok();
}

fn format_display_error(output: &mut String) {
    writeln!(output, "Calibration Display Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not open or drive the calibration display.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Wrong screen index").ok();
    writeln!(output, "     → Screens are 0-indexed; try --screen 0").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Unsupported resolution").ok();
    writeln!(output, "     → Try the native resolution of the monitor").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with the configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Check for TOML syntax errors").ok();
    writeln!(output, "  2. Default location: {}", crate::config::Config::default_path().display()).ok();
    writeln!(output, "  3. Or specify one: gazetrack --config /path/to/config.toml").ok();
}

fn format_session_error(output: &mut String) {
    writeln!(output, "Session Already Active").ok();
    writeln!(output).ok();
    writeln!(output, "Another session holds the tracker in this process.").ok();
    writeln!(output, "Stop or close it before starting a new one.").ok();
}
