pub mod coder; // NGAP cotation: suggestion heuristic + tariff totals
pub mod config;
pub mod documents; // Saved PDFs and letter/sheet templates
pub mod models;
pub mod pipeline; // Remote stages, analysis fallback, flow state machine
pub mod recording; // Microphone capture and codec negotiation
pub mod store; // Shared in-memory consultation state

pub use config::Config;
pub use store::ConsultationStore;
