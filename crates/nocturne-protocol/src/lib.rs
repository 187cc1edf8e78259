//! nocturne-protocol: framing raster fragments over byte channels.
//!
//! The broker and its workers talk over a pair of pipes. Each direction
//! carries self-describing fragment messages: a 40-byte info record
//! ([`info`]) followed by RGB rows. Requests append the two filter
//! parameters; replies carry one fragment per chain stage.
//!
//! Everything here is generic over [`std::io::Read`] and
//! [`std::io::Write`], so tests drive it with in-memory buffers.

pub mod error;
pub mod frame;
pub mod info;

pub use error::ProtocolError;
pub use frame::{
    Request, decode_reply, read_fragment, read_fragment_expecting, read_params, read_reply,
    read_reply_expecting, read_request, write_fragment, write_fragment_columns, write_params,
    write_reply, write_request, write_request_columns,
};
pub use info::{INFO_RECORD_LEN, InfoRecord, MAX_PIXELS};

/// Environment variable carrying the worker's log level.
pub const WORKER_LOG_ENV: &str = "NOCTURNE_LOG";

/// Environment variable carrying the worker's partition index, used only
/// to tag its log lines.
pub const WORKER_INDEX_ENV: &str = "NOCTURNE_WORKER_INDEX";
