use std::panic;

const REDACTED: &str = "[REDACTED]";

const SENSITIVE_MARKERS: [&str; 6] = [
    "password",
    "passwd",
    "token",
    "bearer",
    "authorization",
    "secret",
];

/// Replaces whitespace-separated chunks that carry credentials.
///
/// A chunk is scrubbed when it names a sensitive field, looks like a JWT, or
/// directly follows a `Bearer` keyword.
pub fn redact_text(input: &str) -> String {
    let mut previous_was_scheme = false;

    input
        .split_whitespace()
        .map(|chunk| {
            let scrub = previous_was_scheme || is_sensitive_chunk(chunk);
            previous_was_scheme = chunk.eq_ignore_ascii_case("bearer");
            if scrub {
                REDACTED.to_owned()
            } else {
                chunk.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn install_panic_redaction_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic payload omitted".to_owned());

        let scrubbed = redact_text(&payload);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "campus panic: {} at {}:{}:{}",
                scrubbed,
                location.file(),
                location.line(),
                location.column()
            );
        } else {
            eprintln!("campus panic: {}", scrubbed);
        }
    }));
}

fn is_sensitive_chunk(chunk: &str) -> bool {
    let lowered = chunk.to_ascii_lowercase();

    SENSITIVE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        || looks_like_jwt(chunk)
}

fn looks_like_jwt(value: &str) -> bool {
    let cleaned = value.trim_matches(|ch: char| {
        !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
    });
    let segments: Vec<&str> = cleaned.split('.').collect();

    segments.len() == 3
        && segments[0].starts_with("eyJ")
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        })
}
