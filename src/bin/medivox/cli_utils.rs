use medivox::audio::Recorder;
use medivox::{log_debug, log_debug_content, log_panic};
use std::panic;
use std::sync::OnceLock;

static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Chain the crash-log hook in front of the default panic output.
pub(crate) fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            log_panic(info);
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                .unwrap_or_else(|| "unknown".to_string());
            log_debug(&format!("panic at {location}"));
            log_debug_content(&format!("panic: {info}"));
            previous(info);
        }));
    });
}

pub(crate) fn list_input_devices() {
    // MEDIVOX_TEST_DEVICES overrides detection so tests never need hardware.
    let devices = if let Ok(raw) = std::env::var("MEDIVOX_TEST_DEVICES") {
        parse_device_override(&raw)
    } else {
        Recorder::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
}

fn parse_device_override(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
