use derive_more::{Display, Error};

/// Boundary conditions at the transport edge. These are traced, never
/// propagated: every inbound write still gets exactly one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum LinkError {
    #[display("command is not ASCII (first invalid byte at {valid_up_to})")]
    Decode { valid_up_to: usize },
    #[display("reply is {len} bytes, payload cap is {cap}")]
    PayloadTooLong { len: usize, cap: usize },
}
