/// Codec identifiers in preference order; the first one the platform
/// reports as supported wins.
pub const CODEC_PREFERENCES: &[&str] = &[
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/mp4",
    "audio/wav",
    "audio/ogg;codecs=opus",
    "audio/ogg",
];

/// Fixed fallback when the platform reports none of the preferred
/// codecs as supported.
pub const DEFAULT_CODEC: &str = "audio/webm";

/// Pick the best supported codec identifier.
pub fn negotiate_codec(is_supported: impl Fn(&str) -> bool) -> &'static str {
    CODEC_PREFERENCES
        .iter()
        .copied()
        .find(|codec| is_supported(codec))
        .unwrap_or(DEFAULT_CODEC)
}

/// The codec identifier without its parameters.
pub fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Upload-file extension for a codec identifier. Unknown containers
/// fall back to `webm` for compatibility with the remote endpoints.
pub fn extension_for(mime: &str) -> &'static str {
    match essence(mime) {
        "audio/wav" => "wav",
        "audio/mp4" => "mp4",
        "audio/ogg" => "ogg",
        _ => "webm",
    }
}
