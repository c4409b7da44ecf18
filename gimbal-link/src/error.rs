use gimbal_core::ProtocolError;

/// Failures surfaced by a hub session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("bus transaction failed: {0}")]
    Bus(#[source] E),
    #[error("packet truncated with {expected} cargo bytes outstanding: {source}")]
    Truncated {
        expected: usize,
        #[source]
        source: E,
    },
    #[error("no product id response after {attempts} receive attempts")]
    HandshakeFailed { attempts: u32 },
    #[error("outbound packet rejected: {0:?}")]
    Protocol(ProtocolError),
}
