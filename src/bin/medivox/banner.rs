//! Startup banner for the MediVox shell.

use medivox::config::AppConfig;

/// Version from Cargo.toml
pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shown at startup and carried verbatim from the product copy.
pub(crate) const DISCLAIMER: &str =
    "⚠️ This is for informational purposes only. Always consult a healthcare professional.";

pub(crate) fn show_banner(config: &AppConfig, voice_device: Option<&str>) {
    println!("MediVox {VERSION}");
    println!("service: {}", config.service_url);
    println!("subject: {}", config.subject);
    match voice_device {
        Some(name) => println!("voice: {name} (:voice to talk)"),
        None => println!("voice: unavailable"),
    }
    println!("{DISCLAIMER}");
    println!("type a question, or :help for commands");
    println!();
}
