/// Splits `total` events into work units of `unit_size`; the final unit carries the remainder.
#[derive(Debug, Clone)]
pub struct WorkPlan {
    remaining: u64,
    unit_size: u64,
}

impl WorkPlan {
    pub fn new(total: u64, unit_size: u64) -> Self {
        Self {
            remaining: if unit_size == 0 { 0 } else { total },
            unit_size,
        }
    }
}

impl Iterator for WorkPlan {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        let size = self.remaining.min(self.unit_size);
        self.remaining -= size;
        Some(size)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.unit_size == 0 {
            0
        } else {
            usize::try_from(self.remaining.div_ceil(self.unit_size)).unwrap_or(usize::MAX)
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for WorkPlan {}
