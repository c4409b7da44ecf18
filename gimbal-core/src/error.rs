pub type ParseResult<T> = core::result::Result<T, ProtocolError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    InsufficientData { needed: usize, available: usize },
    InvalidChannel(u8),
    InvalidReportId(u8),
    PayloadTooLarge { size: usize, max: usize },
}
