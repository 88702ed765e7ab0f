//! Error types for the PPv2 codec and the subnet matcher.

/// Wire-level decode failures.
///
/// Every variant is recoverable: a pipeline that hits one delivers the
/// original datagram to the application and moves on. Argument mistakes
/// (a window that does not lie inside the caller's buffer) are not decode
/// errors; they panic at the slicing site like any other out-of-bounds
/// indexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("insufficient data: need at least {min} bytes, got {actual}")]
    InsufficientData { min: usize, actual: usize },
    #[error("invalid protocol signature")]
    InvalidSignature,
    #[error("invalid version: {0}")]
    InvalidVersion(u8),
    #[error("invalid command: {0:#x}")]
    InvalidCommand(u8),
    #[error("invalid address family: {0:#x}")]
    InvalidFamily(u8),
    #[error("invalid transport protocol: {0:#x}")]
    InvalidTransport(u8),
    #[error("truncated address block: need {min} bytes, got {actual}")]
    TruncatedAddresses { min: usize, actual: usize },
    #[error("truncated tlv: declared {declared} bytes, {remaining} remain")]
    TruncatedTlv { declared: usize, remaining: usize },
}

/// Encoder misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("address family does not match the supplied addresses")]
    AddressFamilyMismatch,
}

/// Rejections from [`Subnet`](crate::Subnet) parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubnetParseError {
    #[error("missing '/' separator in CIDR notation")]
    MissingSeparator,
    #[error("invalid network address: {0}")]
    InvalidAddress(String),
    #[error("invalid prefix length {prefix} (must be 0-{max})")]
    InvalidPrefixLength { prefix: String, max: u8 },
}
