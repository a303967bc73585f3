//! Frame descriptors exchanged with the decoder and the display consumer.
//!
//! A descriptor only borrows plane memory. Input descriptors borrow the decoder's
//! planes; output descriptors borrow the context's display buffers and stay valid
//! until the next call that mutably borrows the context.

/// Pixel layout of a descriptor's planes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorFormat {
    /// Plane 0 is Y, plane 1 is interleaved CbCr (Cb in the low byte).
    #[default]
    Yuv420SemiPlanar,
    /// Plane 0 holds `Y0 Cb Y1 Cr` quadruplets.
    Yuyv422,
}

/// Informational flags carried along with a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags {
    pub key_frame: bool,
    /// Output size differs from the previous output frame.
    pub resolution_changed: bool,
    /// The rotation angle changed and the consumer has not acknowledged it yet.
    pub rotation_changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameDescriptor<'a> {
    pub planes: [&'a [u8]; 4],
    pub line_sizes: [usize; 4],
    pub width: u32,
    pub height: u32,
    pub format: ColorFormat,
    pub flags: FrameFlags,
}

impl<'a> FrameDescriptor<'a> {
    /// Semi-planar 4:2:0 frame with both planes sharing one line size.
    pub fn nv12(luma: &'a [u8], chroma: &'a [u8], line_size: usize, width: u32, height: u32) -> Self {
        Self {
            planes: [luma, chroma, &[], &[]],
            line_sizes: [line_size, line_size, 0, 0],
            width,
            height,
            format: ColorFormat::Yuv420SemiPlanar,
            flags: FrameFlags::default(),
        }
    }

    /// Packed frame, one plane.
    pub fn yuyv(data: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            planes: [data, &[], &[], &[]],
            line_sizes: [width as usize * 2, 0, 0, 0],
            width,
            height,
            format: ColorFormat::Yuyv422,
            flags: FrameFlags::default(),
        }
    }

    pub fn luma(&self) -> &'a [u8] {
        self.planes[0]
    }

    pub fn chroma(&self) -> &'a [u8] {
        self.planes[1]
    }

    /// Line size of plane 0 in bytes. A stored 0 means tightly packed rows.
    pub fn line_size(&self) -> usize {
        match self.line_sizes[0] {
            0 => self.row_bytes(),
            n => n,
        }
    }

    /// Visible bytes of one plane-0 row.
    fn row_bytes(&self) -> usize {
        match self.format {
            ColorFormat::Yuv420SemiPlanar => self.width as usize,
            ColorFormat::Yuyv422 => self.width as usize * 2,
        }
    }

    /// Tightly packed copy of the visible luma rows.
    pub fn luma_rows(&self) -> Vec<u8> {
        compact(self.planes[0], self.line_size(), self.row_bytes(), self.height as usize)
    }

    /// Tightly packed copy of the visible chroma rows (empty for packed frames).
    pub fn chroma_rows(&self) -> Vec<u8> {
        match self.format {
            ColorFormat::Yuv420SemiPlanar => compact(
                self.planes[1],
                match self.line_sizes[1] {
                    0 => self.line_size(),
                    n => n,
                },
                self.width as usize & !1,
                self.height as usize / 2,
            ),
            ColorFormat::Yuyv422 => Vec::new(),
        }
    }
}

fn compact(plane: &[u8], line_size: usize, row_bytes: usize, rows: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(row_bytes * rows);
    for r in 0..rows {
        out.extend_from_slice(&plane[r * line_size..r * line_size + row_bytes]);
    }
    out
}

/// Result of one `apply` call that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome<'a> {
    /// The frame was rotated (or passed through) and is ready for display.
    Done(FrameDescriptor<'a>),
    /// Dropped by the frame-rate throttle; nothing was written.
    Skipped,
}

impl<'a> ApplyOutcome<'a> {
    pub fn is_done(&self) -> bool {
        matches!(self, ApplyOutcome::Done(_))
    }

    pub fn frame(self) -> Option<FrameDescriptor<'a>> {
        match self {
            ApplyOutcome::Done(frame) => Some(frame),
            ApplyOutcome::Skipped => None,
        }
    }
}
