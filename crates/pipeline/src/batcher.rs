//! Shared packet buffer
//!
//! Packets from all agent connections accumulate in one mutex-guarded
//! buffer. The size trigger fires inline on append; the 5-second time
//! trigger is driven by the router's flush timer. A batch handed out by
//! either trigger is gone from the buffer; it is the caller's job to
//! persist it or lose it.

use parking_lot::Mutex;

use diag_protocol::NetworkPacket;

/// Mutex-guarded packet buffer with a size trigger
#[derive(Debug)]
pub struct PacketBatcher {
    batch_size: usize,
    buf: Mutex<Vec<NetworkPacket>>,
}

impl PacketBatcher {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            buf: Mutex::new(Vec::with_capacity(batch_size)),
        }
    }

    /// Append packets; returns the full batches the append produced
    ///
    /// Each returned batch holds exactly `batch_size` packets so a
    /// single storage call never exceeds the configured bulk size.
    /// A remainder below the threshold stays buffered for the time
    /// trigger.
    pub fn append(&self, packets: Vec<NetworkPacket>) -> Vec<Vec<NetworkPacket>> {
        let mut buf = self.buf.lock();
        buf.extend(packets);

        let mut full = Vec::new();
        while buf.len() >= self.batch_size {
            let rest = buf.split_off(self.batch_size);
            full.push(std::mem::replace(&mut *buf, rest));
        }
        full
    }

    /// Swap out whatever is buffered, if anything
    ///
    /// Used by the time trigger and the final flush on shutdown.
    pub fn drain(&self) -> Option<Vec<NetworkPacket>> {
        let mut buf = self.buf.lock();
        if buf.is_empty() {
            None
        } else {
            Some(std::mem::replace(
                &mut *buf,
                Vec::with_capacity(self.batch_size),
            ))
        }
    }

    /// Packets currently buffered and unflushed
    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "batcher_test.rs"]
mod tests;
