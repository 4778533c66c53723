//! Collapses overlapping hover regions into one "pointer within surface" bit.
//!
//! The popover surface is the trigger button, the invisible connector strip
//! between trigger and content, and the content panel itself. Moving between
//! them produces leave/enter pairs in either order; the tracker only reports
//! an edge when the union of regions flips.

use serde::{Deserialize, Serialize};

/// One interactive region of the popover surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Bottom-menu icon that opens the popover.
    Trigger,
    /// Gap bridge between trigger and content.
    Connector,
    /// The popover panel listing alerts.
    Content,
}

impl Region {
    const fn bit(self) -> u8 {
        match self {
            Self::Trigger => 0b001,
            Self::Connector => 0b010,
            Self::Content => 0b100,
        }
    }
}

/// Where a pointer-down landed relative to the popover surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerTarget {
    /// On the trigger, connector, or content.
    Inside,
    /// Anywhere else in the window.
    Outside,
}

/// Change in the aggregate hover state caused by one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverEdge {
    /// Pointer moved onto the surface from outside.
    Entered,
    /// Pointer left the last region it was over.
    Exited,
    /// Aggregate state unchanged (moved between regions, duplicate event).
    Unchanged,
}

/// Independent enter/leave observers folded into one boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerTracker {
    inside: u8,
}

impl PointerTracker {
    /// Whether the pointer is over any region.
    #[must_use]
    pub const fn hovered(self) -> bool {
        self.inside != 0
    }

    /// Whether the pointer is over a specific region.
    #[must_use]
    pub const fn is_over(self, region: Region) -> bool {
        self.inside & region.bit() != 0
    }

    /// Record a pointer-enter on `region`.
    pub fn enter(&mut self, region: Region) -> HoverEdge {
        let was = self.hovered();
        self.inside |= region.bit();
        if was {
            HoverEdge::Unchanged
        } else {
            HoverEdge::Entered
        }
    }

    /// Record a pointer-leave on `region`. Leaving a region never entered is
    /// ignored.
    pub fn leave(&mut self, region: Region) -> HoverEdge {
        let was = self.hovered();
        self.inside &= !region.bit();
        if was && !self.hovered() {
            HoverEdge::Exited
        } else {
            HoverEdge::Unchanged
        }
    }

    /// Forget all regions.
    pub fn reset(&mut self) {
        self.inside = 0;
    }
}
