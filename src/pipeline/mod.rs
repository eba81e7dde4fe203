pub mod analyze;
pub mod client;
pub mod flow;
pub mod types;

pub use analyze::*;
pub use client::*;
pub use flow::*;
pub use types::*;

use thiserror::Error;

/// Errors raised by the remote pipeline stages.
///
/// Every stage is a single request/response call with no automatic
/// retry; each failure surfaces as exactly one notification at the
/// trigger boundary. Display strings are the user-facing French text.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Échec de la transcription (statut {status})")]
    Transcription { status: u16 },

    #[error("Échec de la structuration (statut {status})")]
    Structuring { status: u16 },

    #[error("Échec de la relance (statut {status})")]
    Clarification { status: u16 },

    #[error("Échec de la dictée vocale (statut {status})")]
    Dictation { status: u16 },

    #[error("Échec de la génération du document (statut {status})")]
    DocumentGeneration { status: u16 },

    #[error("La réponse n'est pas un fichier PDF (Content-Type: {content_type})")]
    NotPdf { content_type: String },

    #[error("Champ requis manquant : {0}")]
    MissingField(&'static str),

    #[error("Erreur réseau : {0}")]
    Http(String),

    #[error("Réponse illisible : {0}")]
    ResponseParsing(String),
}
