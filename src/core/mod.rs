//! # Core Module
//!
//! Concurrency primitives shared between the input side of the application and
//! the render thread.
//!
//! ## Key Components
//! - `DragAccumulator`: Lock-free accumulate-then-consume cell for drag rotation deltas
//!
//! ## Usage
//! ```rust
//! use cube_batch::core::DragAccumulator;
//!
//! let drag = DragAccumulator::new();
//! drag.accumulate(1.5, -2.0);
//! drag.accumulate(0.5, 0.0);
//! assert_eq!(drag.consume(), (2.0, -2.0));
//! assert_eq!(drag.consume(), (0.0, 0.0));
//! ```

pub mod drag_accumulator;

pub use drag_accumulator::DragAccumulator;
