use std::sync::atomic::{AtomicU32, Ordering};

/// A single `f32` stored as its bit pattern in an `AtomicU32`.
///
/// Additions use a compare-and-swap loop so concurrent writers never lose an
/// update; reads swap the stored value back to zero.
#[derive(Debug, Default)]
struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    fn add(&self, amount: f32) {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + amount).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    fn take(&self) -> f32 {
        f32::from_bits(self.bits.swap(0.0f32.to_bits(), Ordering::AcqRel))
    }

    fn peek(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Accumulated drag rotation, in degrees, waiting to be applied by the next frame.
///
/// The input side calls [`accumulate`](Self::accumulate) for every pointer
/// movement while a drag is active. The render thread calls
/// [`consume`](Self::consume) exactly once per frame, which returns the total
/// since the previous frame and resets both axes to zero.
///
/// The horizontal delta rotates around the Y axis and the vertical delta
/// around the X axis.
///
/// # Examples
///
/// ## Sharing Between Threads
/// ```
/// # use std::{sync::Arc, thread};
/// use cube_batch::core::DragAccumulator;
///
/// let drag = Arc::new(DragAccumulator::new());
/// let input_side = drag.clone();
///
/// thread::spawn(move || input_side.accumulate(3.0, 1.0))
///     .join()
///     .unwrap();
///
/// assert_eq!(drag.consume(), (3.0, 1.0));
/// ```
#[derive(Debug, Default)]
pub struct DragAccumulator {
    delta_x: AtomicF32,
    delta_y: AtomicF32,
}

impl DragAccumulator {
    /// Creates an accumulator with both axes at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a drag delta to the pending total.
    ///
    /// # Arguments
    /// * `delta_x` - Degrees of rotation around the Y axis
    /// * `delta_y` - Degrees of rotation around the X axis
    pub fn accumulate(&self, delta_x: f32, delta_y: f32) {
        if delta_x != 0.0 {
            self.delta_x.add(delta_x);
        }
        if delta_y != 0.0 {
            self.delta_y.add(delta_y);
        }
    }

    /// Returns the pending total and resets it to zero.
    ///
    /// # Returns
    /// `(delta_x, delta_y)` accumulated since the previous call
    pub fn consume(&self) -> (f32, f32) {
        (self.delta_x.take(), self.delta_y.take())
    }

    /// Returns the pending total without resetting it.
    pub fn pending(&self) -> (f32, f32) {
        (self.delta_x.peek(), self.delta_y.peek())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn consume_resets_to_zero() {
        let drag = DragAccumulator::new();
        drag.accumulate(2.5, -1.0);
        drag.accumulate(-0.5, 4.0);

        assert_eq!(drag.pending(), (2.0, 3.0));
        assert_eq!(drag.consume(), (2.0, 3.0));
        assert_eq!(drag.consume(), (0.0, 0.0));
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let drag = Arc::new(DragAccumulator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let drag = drag.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        drag.accumulate(1.0, 0.5);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(drag.consume(), (4000.0, 2000.0));
    }
}
