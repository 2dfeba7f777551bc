//! Recorded call records
//!
//! A call is produced once by a `CallSource`, retraced once, then dropped.

use std::fmt;

use bitflags::bitflags;

/// Originating thread id of a call in the recorded trace
pub type Leg = u32;

/// The leg whose runner executes on the thread that starts the race
pub const FORERUNNER_LEG: Leg = 0;

bitflags! {
    /// Behavioral flags attached to a recorded call
    ///
    /// Unknown bits are carried through untouched so traces written by newer
    /// recorders still replay.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallFlags: u32 {
        const NONE = 0;
        /// The call completes a frame (swapbuffers / present)
        const END_FRAME = 1 << 0;
        /// The call switches the current render target
        const SWAP_RENDERTARGET = 1 << 1;
    }
}

impl fmt::Display for CallFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::END_FRAME) {
            names.push("end-frame");
        }
        if self.contains(Self::SWAP_RENDERTARGET) {
            names.push("swap-rendertarget");
        }
        if names.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Sequence number, unique and increasing across the whole trace
    pub no: u32,
    /// Leg (thread id) that issued the call
    pub thread_id: Leg,
    /// Behavioral flags
    pub flags: CallFlags,
    /// Opaque payload, only the executor interprets it
    pub payload: Vec<u8>,
}

impl Call {
    /// Create a call with no flags and an empty payload
    pub fn new(no: u32, thread_id: Leg) -> Self {
        Self {
            no,
            thread_id,
            flags: CallFlags::NONE,
            payload: Vec::new(),
        }
    }

    /// Builder-style setter for flags
    pub fn with_flags(mut self, flags: CallFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Builder-style setter for the payload
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    #[inline]
    pub fn ends_frame(&self) -> bool {
        self.flags.contains(CallFlags::END_FRAME)
    }

    #[inline]
    pub fn swaps_render_target(&self) -> bool {
        self.flags.contains(CallFlags::SWAP_RENDERTARGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_contains() {
        let flags = CallFlags::END_FRAME | CallFlags::SWAP_RENDERTARGET;
        assert!(flags.contains(CallFlags::END_FRAME));
        assert!(flags.contains(CallFlags::SWAP_RENDERTARGET));
        assert!(!CallFlags::END_FRAME.contains(CallFlags::SWAP_RENDERTARGET));
        assert!(CallFlags::NONE.is_empty());
    }

    #[test]
    fn test_unknown_bits_preserved() {
        let flags = CallFlags::from_bits_retain(0x80 | 1);
        assert_eq!(flags.bits(), 0x81);
        assert!(flags.contains(CallFlags::END_FRAME));
        assert!(!flags.intersects(CallFlags::SWAP_RENDERTARGET));
        assert_eq!(CallFlags::from_bits(0x81), None);
    }

    #[test]
    fn test_call_builders() {
        let call = Call::new(7, 2)
            .with_flags(CallFlags::SWAP_RENDERTARGET)
            .with_payload(vec![1, 2, 3]);
        assert_eq!(call.no, 7);
        assert_eq!(call.thread_id, 2);
        assert!(call.swaps_render_target());
        assert!(!call.ends_frame());
        assert_eq!(call.payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_flags_display() {
        assert_eq!(CallFlags::NONE.to_string(), "-");
        assert_eq!(
            (CallFlags::END_FRAME | CallFlags::SWAP_RENDERTARGET).to_string(),
            "end-frame|swap-rendertarget"
        );
    }
}
