//! Fixed geometry of the vertical strip.

/// Largest canvas edge accepted, in either direction.
pub const MAX_STRIP_DIMENSION: u32 = 7680;

/// Pixel rectangle on the strip canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Canvas size, margins and number of slots.
///
/// Slots are stacked top to bottom with `padding` around the edges and `gap`
/// between neighbours; their height is whatever is left divided evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub gap: u32,
    pub count: usize,
}

impl Default for StripLayout {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            padding: 40,
            gap: 20,
            count: 3,
        }
    }
}

impl StripLayout {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Check that the canvas is allocatable and every slot has a positive size.
    pub fn validate(&self) -> Result<(), String> {
        if self.count == 0 {
            return Err("strip needs at least one slot".to_string());
        }
        if self.width > MAX_STRIP_DIMENSION || self.height > MAX_STRIP_DIMENSION {
            return Err(format!(
                "strip size {}x{} exceeds maximum supported ({}px per side)",
                self.width, self.height, MAX_STRIP_DIMENSION
            ));
        }
        if self.slot_width() == 0 {
            return Err(format!(
                "padding {} leaves no room on a {}px wide strip",
                self.padding, self.width
            ));
        }
        if self.slot_height() < 1.0 {
            return Err(format!(
                "{} slots with padding {} and gap {} do not fit a {}px tall strip",
                self.count, self.padding, self.gap, self.height
            ));
        }
        Ok(())
    }

    /// Exact (fractional) slot height.
    pub fn slot_height(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let gaps = self.count.saturating_sub(1) as f64 * self.gap as f64;
        (self.height as f64 - 2.0 * self.padding as f64 - gaps) / self.count as f64
    }

    pub fn slot_width(&self) -> u32 {
        self.width.saturating_sub(self.padding.saturating_mul(2))
    }

    /// Exact top edge of slot `index`.
    pub fn slot_top(&self, index: usize) -> f64 {
        self.padding as f64 + index as f64 * (self.slot_height() + self.gap as f64)
    }

    /// Slot `index` snapped to whole pixels.
    ///
    /// Both edges are rounded independently, so neighbouring slots keep the
    /// exact gap on average and the last slot ends exactly `padding` above
    /// the bottom edge.
    pub fn slot_rect(&self, index: usize) -> SlotRect {
        let top = self.slot_top(index);
        let y0 = top.round() as u32;
        let y1 = (top + self.slot_height()).round() as u32;
        SlotRect {
            x: self.padding,
            y: y0,
            width: self.slot_width(),
            height: y1.saturating_sub(y0),
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = SlotRect> + '_ {
        (0..self.count).map(|i| self.slot_rect(i))
    }
}
