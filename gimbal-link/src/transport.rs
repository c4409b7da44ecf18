/// A half-duplex byte bus carrying hub traffic.
///
/// One call is one bus transaction. The hub frames every transaction it
/// answers with its own 4-byte header, so a read of N bytes hands back
/// at most N bytes of that frame and the session layer re-reads for the
/// rest.
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one transaction to the hub.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fill `buf` from one read transaction.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}
