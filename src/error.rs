// 🚨 API Errors - typed failures from the remote collaborator
//
// Everything else in the crate uses anyhow; these are the failures callers
// may want to match on (bad status, wrong JSON shape).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} returned an unexpected payload (expected {expected})")]
    Shape {
        endpoint: String,
        expected: &'static str,
    },

    #[error("{endpoint} count reply has no usable total: {body}")]
    Count { endpoint: String, body: String },
}
