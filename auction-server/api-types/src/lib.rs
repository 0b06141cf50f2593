pub mod auction;
pub mod ws;

/// Opaque identity of a bidder or viewer. The server never interprets it
/// beyond equality checks.
pub type BidderId = String;

/// Epoch milliseconds, the unit all auction deadlines are expressed in.
pub type UnixTimestampMs = i64;
