//! Software canvas
//!
//! Draw commands are decoded from call payloads and buffered; they only hit
//! the pixels on a flush. Flushes happen on demand, on target switches,
//! presents and resizes, and before every capture.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::snapshot::Image;
use crate::utils::CommandError;

/// One decoded draw command
///
/// Payload layout is an opcode byte followed by little-endian operands.
/// An empty payload is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrawCommand {
    Nop,
    Clear([u8; 4]),
    FillRect {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: [u8; 4],
    },
    Resize {
        width: u16,
        height: u16,
    },
    BindTarget(u8),
    Present,
}

impl DrawCommand {
    pub const OP_NOP: u8 = 0;
    pub const OP_CLEAR: u8 = 1;
    pub const OP_FILL_RECT: u8 = 2;
    pub const OP_RESIZE: u8 = 3;
    pub const OP_BIND_TARGET: u8 = 4;
    pub const OP_PRESENT: u8 = 5;

    /// Decode a call payload
    pub fn decode(payload: &[u8]) -> Result<Self, CommandError> {
        let Some((&opcode, operands)) = payload.split_first() else {
            return Ok(Self::Nop);
        };

        let expect = |expected: usize| {
            if operands.len() == expected {
                Ok(())
            } else {
                Err(CommandError::Length {
                    opcode,
                    expected,
                    actual: operands.len(),
                })
            }
        };
        let u16_at = |offset: usize| u16::from_le_bytes([operands[offset], operands[offset + 1]]);
        let rgba_at = |offset: usize| {
            [
                operands[offset],
                operands[offset + 1],
                operands[offset + 2],
                operands[offset + 3],
            ]
        };

        match opcode {
            Self::OP_NOP => {
                expect(0)?;
                Ok(Self::Nop)
            }
            Self::OP_CLEAR => {
                expect(4)?;
                Ok(Self::Clear(rgba_at(0)))
            }
            Self::OP_FILL_RECT => {
                expect(12)?;
                Ok(Self::FillRect {
                    x: u16_at(0),
                    y: u16_at(2),
                    width: u16_at(4),
                    height: u16_at(6),
                    color: rgba_at(8),
                })
            }
            Self::OP_RESIZE => {
                expect(4)?;
                Ok(Self::Resize {
                    width: u16_at(0),
                    height: u16_at(2),
                })
            }
            Self::OP_BIND_TARGET => {
                expect(1)?;
                Ok(Self::BindTarget(operands[0]))
            }
            Self::OP_PRESENT => {
                expect(0)?;
                Ok(Self::Present)
            }
            other => Err(CommandError::UnknownOpcode(other)),
        }
    }

    /// Encode as a call payload
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13);
        match *self {
            Self::Nop => out.push(Self::OP_NOP),
            Self::Clear(color) => {
                out.push(Self::OP_CLEAR);
                out.extend_from_slice(&color);
            }
            Self::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                out.push(Self::OP_FILL_RECT);
                for v in [x, y, width, height] {
                    out.extend_from_slice(&v.to_le_bytes());
                }
                out.extend_from_slice(&color);
            }
            Self::Resize { width, height } => {
                out.push(Self::OP_RESIZE);
                out.extend_from_slice(&width.to_le_bytes());
                out.extend_from_slice(&height.to_le_bytes());
            }
            Self::BindTarget(id) => {
                out.push(Self::OP_BIND_TARGET);
                out.push(id);
            }
            Self::Present => out.push(Self::OP_PRESENT),
        }
        out
    }
}

/// Summary of one render target in a state dump
#[derive(Debug, Clone, Serialize)]
pub struct TargetState {
    pub id: u8,
    pub width: u32,
    pub height: u32,
    /// FNV-1a over the RGBA bytes
    pub checksum: u64,
}

/// Serializable canvas state
#[derive(Debug, Clone, Serialize)]
pub struct CanvasState {
    pub bound_target: u8,
    pub targets: Vec<TargetState>,
    pub pending: Vec<DrawCommand>,
    pub pixels_drawn: u64,
    pub presents: u64,
}

/// Render targets plus the commands not yet rasterized
pub struct Canvas {
    width: u32,
    height: u32,
    targets: BTreeMap<u8, RgbaImage>,
    bound: u8,
    pending: Vec<DrawCommand>,
    pixels_drawn: u64,
    presents: u64,
    raster_time: Duration,
}

impl Canvas {
    /// Canvas with target 0 bound, `width`x`height`
    pub fn new(width: u32, height: u32) -> Self {
        let mut targets = BTreeMap::new();
        targets.insert(0, RgbaImage::new(width, height));
        Self {
            width,
            height,
            targets,
            bound: 0,
            pending: Vec::new(),
            pixels_drawn: 0,
            presents: 0,
            raster_time: Duration::ZERO,
        }
    }

    /// Queue or perform one command
    pub fn submit(&mut self, command: DrawCommand) {
        match command {
            DrawCommand::Nop => {}
            DrawCommand::Clear(_) | DrawCommand::FillRect { .. } => self.pending.push(command),
            DrawCommand::Resize { width, height } => {
                self.flush();
                self.width = u32::from(width);
                self.height = u32::from(height);
                self.targets
                    .insert(self.bound, RgbaImage::new(self.width, self.height));
            }
            DrawCommand::BindTarget(id) => {
                self.flush();
                self.bound = id;
                let (width, height) = (self.width, self.height);
                self.targets
                    .entry(id)
                    .or_insert_with(|| RgbaImage::new(width, height));
            }
            DrawCommand::Present => {
                self.flush();
                self.presents += 1;
            }
        }
    }

    /// Rasterize every pending command into the bound target
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let started = Instant::now();
        let (width, height) = (self.width, self.height);
        let target = self
            .targets
            .entry(self.bound)
            .or_insert_with(|| RgbaImage::new(width, height));

        for command in self.pending.drain(..) {
            match command {
                DrawCommand::Clear(color) => {
                    for pixel in target.pixels_mut() {
                        *pixel = Rgba(color);
                    }
                    self.pixels_drawn += u64::from(target.width()) * u64::from(target.height());
                }
                DrawCommand::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let x0 = u32::from(x).min(target.width());
                    let y0 = u32::from(y).min(target.height());
                    let x1 = (u32::from(x) + u32::from(width)).min(target.width());
                    let y1 = (u32::from(y) + u32::from(height)).min(target.height());
                    for py in y0..y1 {
                        for px in x0..x1 {
                            target.put_pixel(px, py, Rgba(color));
                        }
                    }
                    self.pixels_drawn += u64::from(x1 - x0) * u64::from(y1 - y0);
                }
                _ => {}
            }
        }
        self.raster_time += started.elapsed();
    }

    /// Flush, then copy out the bound target
    pub fn capture(&mut self) -> Image {
        self.flush();
        match self.targets.get(&self.bound) {
            Some(target) => Image::from(target.clone()),
            None => Image::new(self.width, self.height),
        }
    }

    pub fn bound_target(&self) -> u8 {
        self.bound
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn pixels_drawn(&self) -> u64 {
        self.pixels_drawn
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }

    /// Time spent rasterizing
    pub fn raster_time(&self) -> Duration {
        self.raster_time
    }

    pub fn state(&self) -> CanvasState {
        CanvasState {
            bound_target: self.bound,
            targets: self
                .targets
                .iter()
                .map(|(&id, target)| TargetState {
                    id,
                    width: target.width(),
                    height: target.height(),
                    checksum: fnv1a(target.as_raw()),
                })
                .collect(),
            pending: self.pending.clone(),
            pixels_drawn: self.pixels_drawn,
            presents: self.presents,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}
