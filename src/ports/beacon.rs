//! Best-effort beacon delivery abstraction. Implementations must hand the
//! payload off without blocking; the boolean only reports the hand-off.
pub trait BeaconTransport: Send + Sync {
    /// Queue `payload` for delivery to `url`. `false` means the payload was
    /// dropped on the floor; there is no retry.
    fn deliver(&self, url: &str, payload: &[u8]) -> bool;
}
