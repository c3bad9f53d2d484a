//! Error taxonomy for the relay's protocol and admission pipeline.
//!
//! Transport-level failures (read/write errors on the socket) are not
//! modeled here: they are fatal to a single connection and are handled
//! directly by the connection driver (`connection.rs`) as it unwinds its
//! read loop.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RelayError {
    #[snafu(display("invalid JSON: {reason}"))]
    MalformedFrame { reason: String },

    #[snafu(display("invalid: {reason}"))]
    MalformedEvent { reason: String },

    #[snafu(display("invalid: bad id"))]
    BadId,

    #[snafu(display("invalid: bad id/signature"))]
    BadSignature,

    #[snafu(display("error: {reason}"))]
    StoreError { reason: String },
}

impl RelayError {
    /// Message suitable for the `OK`/`NOTICE` wire response, per the
    /// error-taxonomy response table.
    pub fn wire_message(&self) -> String {
        self.to_string()
    }
}
