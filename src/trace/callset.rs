//! Call-selection sets
//!
//! Selects which calls get snapshotted or compared. Text syntax is a
//! comma-separated list of elements:
//!
//! - `*` every call
//! - `frame` every call that ends a frame
//! - `rendertarget` every call that ends a frame or swaps the render target
//! - `N` or `N-M` (inclusive, `N-` is open ended)
//!
//! Any element may carry a `/STEP`, `/frame` or `/rendertarget` suffix,
//! e.g. `100-200/10` or `0-1000/frame`.

use std::fmt;
use std::str::FromStr;

use super::call::{Call, CallFlags};
use crate::utils::CallSetError;

/// Which calls inside a range qualify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallFrequency {
    #[default]
    All,
    Frame,
    RenderTarget,
}

impl CallFrequency {
    fn matches(&self, call: &Call) -> bool {
        match self {
            CallFrequency::All => true,
            CallFrequency::Frame => call.ends_frame(),
            CallFrequency::RenderTarget => call
                .flags
                .intersects(CallFlags::END_FRAME | CallFlags::SWAP_RENDERTARGET),
        }
    }

    fn keyword(word: &str) -> Option<Self> {
        match word {
            "frame" => Some(CallFrequency::Frame),
            "rendertarget" => Some(CallFrequency::RenderTarget),
            _ => None,
        }
    }
}

/// One element of a call set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CallRange {
    pub start: u32,
    pub stop: u32,
    pub step: u32,
    pub freq: CallFrequency,
}

impl CallRange {
    pub fn contains(&self, call: &Call) -> bool {
        call.no >= self.start
            && call.no <= self.stop
            && (call.no - self.start) % self.step == 0
            && self.freq.matches(call)
    }
}

/// A set of calls selected for snapshotting or comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSet {
    ranges: Vec<CallRange>,
}

impl CallSet {
    /// The empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every call flagged as ending a frame
    pub fn every_frame() -> Self {
        Self::with_frequency(CallFrequency::Frame)
    }

    /// Every call matching a frequency across the whole trace
    pub fn with_frequency(freq: CallFrequency) -> Self {
        Self {
            ranges: vec![CallRange {
                start: 0,
                stop: u32::MAX,
                step: 1,
                freq,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Membership predicate consumed by the retracer
    pub fn contains(&self, call: &Call) -> bool {
        self.ranges.iter().any(|r| r.contains(call))
    }

    fn parse_element(element: &str) -> Result<CallRange, CallSetError> {
        let (range_text, suffix) = match element.split_once('/') {
            Some((range_text, suffix)) => (range_text.trim(), Some(suffix.trim())),
            None => (element, None),
        };

        let mut range = if range_text == "*" {
            CallRange {
                start: 0,
                stop: u32::MAX,
                step: 1,
                freq: CallFrequency::All,
            }
        } else if let Some(freq) = CallFrequency::keyword(range_text) {
            CallRange {
                start: 0,
                stop: u32::MAX,
                step: 1,
                freq,
            }
        } else if let Some((start, stop)) = range_text.split_once('-') {
            let start = parse_number(start)?;
            let stop = if stop.trim().is_empty() {
                u32::MAX
            } else {
                parse_number(stop)?
            };
            if start > stop {
                return Err(CallSetError::InvalidRange(range_text.to_string()));
            }
            CallRange {
                start,
                stop,
                step: 1,
                freq: CallFrequency::All,
            }
        } else {
            let no = parse_number(range_text)?;
            CallRange {
                start: no,
                stop: no,
                step: 1,
                freq: CallFrequency::All,
            }
        };

        if let Some(suffix) = suffix {
            if let Some(freq) = CallFrequency::keyword(suffix) {
                range.freq = freq;
            } else {
                match suffix.parse::<u32>() {
                    Ok(step) if step > 0 => range.step = step,
                    _ => return Err(CallSetError::InvalidStep(suffix.to_string())),
                }
            }
        }

        Ok(range)
    }
}

fn parse_number(text: &str) -> Result<u32, CallSetError> {
    let text = text.trim();
    text.parse::<u32>()
        .map_err(|_| CallSetError::InvalidNumber(text.to_string()))
}

impl FromStr for CallSet {
    type Err = CallSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for element in s.split(',') {
            let element = element.trim();
            if element.is_empty() {
                return Err(CallSetError::EmptyElement(s.to_string()));
            }
            ranges.push(Self::parse_element(element)?);
        }
        Ok(Self { ranges })
    }
}

impl fmt::Display for CallSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|r| {
                let mut text = match (r.start, r.stop) {
                    (0, u32::MAX) => match r.freq {
                        CallFrequency::All => "*".to_string(),
                        CallFrequency::Frame => "frame".to_string(),
                        CallFrequency::RenderTarget => "rendertarget".to_string(),
                    },
                    (start, stop) if start == stop => start.to_string(),
                    (start, u32::MAX) => format!("{}-", start),
                    (start, stop) => format!("{}-{}", start, stop),
                };
                let whole_trace = r.start == 0 && r.stop == u32::MAX;
                match r.freq {
                    CallFrequency::Frame if !whole_trace => text.push_str("/frame"),
                    CallFrequency::RenderTarget if !whole_trace => {
                        text.push_str("/rendertarget")
                    }
                    _ => {}
                }
                if r.step > 1 {
                    text.push_str(&format!("/{}", r.step));
                }
                text
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(no: u32) -> Call {
        Call::new(no, 0)
    }

    fn frame_call(no: u32) -> Call {
        Call::new(no, 0).with_flags(CallFlags::END_FRAME)
    }

    #[test]
    fn test_empty_contains_nothing() {
        let set = CallSet::empty();
        assert!(set.is_empty());
        assert!(!set.contains(&frame_call(0)));
    }

    #[test]
    fn test_every_frame() {
        let set = CallSet::every_frame();
        assert!(set.contains(&frame_call(5)));
        assert!(!set.contains(&call(5)));
        assert!(!set.contains(&Call::new(5, 0).with_flags(CallFlags::SWAP_RENDERTARGET)));
    }

    #[test]
    fn test_rendertarget_frequency() {
        let set: CallSet = "rendertarget".parse().unwrap();
        assert!(set.contains(&frame_call(1)));
        assert!(set.contains(&Call::new(2, 0).with_flags(CallFlags::SWAP_RENDERTARGET)));
        assert!(!set.contains(&call(3)));
    }

    #[test]
    fn test_single_and_ranges() {
        let set: CallSet = "3, 10-12, 20-".parse().unwrap();
        assert!(set.contains(&call(3)));
        assert!(!set.contains(&call(4)));
        assert!(set.contains(&call(10)));
        assert!(set.contains(&call(12)));
        assert!(!set.contains(&call(13)));
        assert!(set.contains(&call(20)));
        assert!(set.contains(&call(4_000_000)));
    }

    #[test]
    fn test_step_suffix() {
        let set: CallSet = "100-200/10".parse().unwrap();
        assert!(set.contains(&call(100)));
        assert!(set.contains(&call(110)));
        assert!(!set.contains(&call(105)));
        assert!(set.contains(&call(200)));
        assert!(!set.contains(&call(210)));
    }

    #[test]
    fn test_frame_suffix() {
        let set: CallSet = "0-50/frame".parse().unwrap();
        assert!(set.contains(&frame_call(50)));
        assert!(!set.contains(&call(50)));
        assert!(!set.contains(&frame_call(51)));
    }

    #[test]
    fn test_star() {
        let set: CallSet = "*".parse().unwrap();
        assert!(set.contains(&call(0)));
        assert!(set.contains(&call(u32::MAX)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "abc".parse::<CallSet>(),
            Err(CallSetError::InvalidNumber("abc".to_string()))
        );
        assert_eq!(
            "9-3".parse::<CallSet>(),
            Err(CallSetError::InvalidRange("9-3".to_string()))
        );
        assert_eq!(
            "1-9/0".parse::<CallSet>(),
            Err(CallSetError::InvalidStep("0".to_string()))
        );
        assert!(matches!(
            "1,,2".parse::<CallSet>(),
            Err(CallSetError::EmptyElement(_))
        ));
    }

    #[test]
    fn test_display() {
        let set: CallSet = "frame,7,10-20/5,30-,0-9/rendertarget".parse().unwrap();
        assert_eq!(set.to_string(), "frame,7,10-20/5,30-,0-9/rendertarget");
    }
}
