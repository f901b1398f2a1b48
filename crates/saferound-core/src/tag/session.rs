//! Tag hardware seam and the scoped session over it.

use tracing::debug;

use crate::error::HardwareError;

/// An NFC reader/writer. One session at a time; every successful
/// [`TagHardware::request_session`] must be paired with exactly one
/// [`TagHardware::release_session`].
#[allow(async_fn_in_trait)]
pub trait TagHardware {
    async fn request_session(&mut self) -> Result<(), HardwareError>;
    async fn read_payload(&mut self) -> Result<Vec<u8>, HardwareError>;
    async fn write_payload(&mut self, payload: &[u8]) -> Result<(), HardwareError>;
    fn release_session(&mut self);
}

/// An open tag session. Released on [`TagSession::close`] or on drop,
/// whichever happens first, so early returns and cancelled futures never
/// leave the hardware held.
pub struct TagSession<'a, H: TagHardware> {
    hardware: &'a mut H,
    open: bool,
}

impl<'a, H: TagHardware> TagSession<'a, H> {
    /// Acquire a session. A failed request is still released so the
    /// reader is never left half-open.
    pub async fn open(hardware: &'a mut H) -> Result<Self, HardwareError> {
        if let Err(err) = hardware.request_session().await {
            hardware.release_session();
            return Err(err);
        }
        debug!("tag session opened");
        Ok(Self {
            hardware,
            open: true,
        })
    }

    pub async fn read(&mut self) -> Result<Vec<u8>, HardwareError> {
        self.hardware.read_payload().await
    }

    pub async fn write(&mut self, payload: &[u8]) -> Result<(), HardwareError> {
        self.hardware.write_payload(payload).await
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.hardware.release_session();
            debug!("tag session released");
        }
    }
}

impl<H: TagHardware> Drop for TagSession<'_, H> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory tag that records session bookkeeping.
    #[derive(Debug, Default)]
    pub struct MemoryTag {
        pub payload: Vec<u8>,
        pub refuse_session: bool,
        pub fail_io: bool,
        pub sessions_requested: usize,
        pub sessions_released: usize,
    }

    impl TagHardware for MemoryTag {
        async fn request_session(&mut self) -> Result<(), HardwareError> {
            self.sessions_requested += 1;
            if self.refuse_session {
                return Err(HardwareError::SessionUnavailable("NFC disabled".into()));
            }
            Ok(())
        }

        async fn read_payload(&mut self) -> Result<Vec<u8>, HardwareError> {
            if self.fail_io {
                return Err(HardwareError::TagIo("tag lost".into()));
            }
            Ok(self.payload.clone())
        }

        async fn write_payload(&mut self, payload: &[u8]) -> Result<(), HardwareError> {
            if self.fail_io {
                return Err(HardwareError::TagIo("tag lost".into()));
            }
            self.payload = payload.to_vec();
            Ok(())
        }

        fn release_session(&mut self) {
            self.sessions_released += 1;
        }
    }
}
