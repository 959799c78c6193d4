//! Request logging.
//!
//! # Responsibilities
//! - Render method, path, headers and body snapshot as one record
//! - Emit the record before the request is forwarded
//!
//! # Design Decisions
//! - A record is a single tracing event so concurrent records never interleave
//! - Header values with the same name are joined with ", " in arrival order
//! - Body bytes are rendered lossily; binary payloads may look garbled

use axum::http::request::Parts;

use crate::http::body::CapturedBody;

/// Render the diagnostic record for an inbound request.
pub fn format_request(parts: &Parts, body: &CapturedBody) -> String {
    let mut record = format!("REQUEST: {} {}\n", parts.method, parts.uri.path());

    record.push_str("  Headers:\n");
    for name in parts.headers.keys() {
        let values: Vec<_> = parts
            .headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect();
        record.push_str(&format!("    {}: {}\n", name, values.join(", ")));
    }

    match body {
        CapturedBody::Absent => {}
        CapturedBody::Read(snapshot) if snapshot.is_empty() => {}
        CapturedBody::Read(snapshot) => {
            record.push_str(&format!(
                "  Body ({} bytes):\n    {}\n",
                snapshot.total_len(),
                String::from_utf8_lossy(snapshot.displayed())
            ));
            if snapshot.is_truncated() {
                record.push_str(&format!(
                    "    ... truncated ({} bytes total)\n",
                    snapshot.total_len()
                ));
            }
        }
        CapturedBody::Failed(detail) => {
            record.push_str(&format!("  Body: <error reading: {}>\n", detail));
        }
    }

    record
}

/// Write the request record to the log.
pub fn log_request(parts: &Parts, body: &CapturedBody) {
    let record = format_request(parts, body);
    tracing::info!("{}", record.trim_end_matches('\n'));
}
