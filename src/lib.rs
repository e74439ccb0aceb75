pub mod audio;
pub mod config;
pub mod doctor;
pub mod gateway;
mod logging;
pub mod session;
mod telemetry;
pub mod vitals;
pub mod voice;

pub use logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
pub use session::{ChatSession, SessionEvent, SessionStatus, SubmitOutcome};
pub use telemetry::init_tracing;
pub use voice::{ToggleOutcome, VoiceController, VoiceEvent, VoicePhase};
