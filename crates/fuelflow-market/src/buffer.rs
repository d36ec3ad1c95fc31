//! Ordered, capacity-limited material inventory.
//!
//! `ResBuf` is a FIFO of materials. Quantity-based pops take from the front
//! and split the last material touched so the popped total matches the
//! request; popped pieces are merged into a single material.

use std::collections::VecDeque;

use fuelflow_core::constants::EPS_RSRC;
use fuelflow_core::error::BufferError;

use crate::material::Material;

/// FIFO material buffer with a mass capacity.
#[derive(Debug, Clone)]
pub struct ResBuf {
    mats: VecDeque<Material>,
    capacity: f64,
    qty: f64,
}

impl Default for ResBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl ResBuf {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self {
            mats: VecDeque::new(),
            capacity: f64::INFINITY,
            qty: 0.0,
        }
    }

    /// Buffer holding at most `capacity` kg.
    pub fn with_capacity(capacity: f64) -> Result<Self, BufferError> {
        let mut buf = Self::new();
        buf.set_capacity(capacity)?;
        Ok(buf)
    }

    /// Change the capacity. Fails if it is negative or below the current
    /// quantity.
    pub fn set_capacity(&mut self, capacity: f64) -> Result<(), BufferError> {
        if capacity.is_nan() || capacity < 0.0 {
            return Err(BufferError::NegativeQuantity(capacity));
        }
        if self.qty - capacity > EPS_RSRC {
            return Err(BufferError::CapacityExceeded {
                space: capacity,
                pushed: self.qty,
            });
        }
        self.capacity = capacity;
        Ok(())
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Total kg held.
    pub fn quantity(&self) -> f64 {
        self.qty
    }

    /// Remaining kg before capacity.
    pub fn space(&self) -> f64 {
        (self.capacity - self.qty).max(0.0)
    }

    /// Number of materials held.
    pub fn count(&self) -> usize {
        self.mats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mats.is_empty()
    }

    /// Append a material to the back.
    pub fn push(&mut self, mat: Material) -> Result<(), BufferError> {
        let space = self.space();
        if mat.quantity() - space > EPS_RSRC {
            return Err(BufferError::CapacityExceeded {
                space,
                pushed: mat.quantity(),
            });
        }
        self.mats.push_back(mat);
        self.update_qty();
        Ok(())
    }

    /// Append all materials, or none if they do not fit together.
    pub fn push_all(&mut self, mats: Vec<Material>) -> Result<(), BufferError> {
        let space = self.space();
        let pushed: f64 = mats.iter().map(Material::quantity).sum();
        if pushed - space > EPS_RSRC {
            return Err(BufferError::CapacityExceeded { space, pushed });
        }
        self.mats.extend(mats);
        self.update_qty();
        Ok(())
    }

    /// Remove the front material.
    pub fn pop(&mut self) -> Result<Material, BufferError> {
        let mat = self.mats.pop_front().ok_or(BufferError::Empty)?;
        self.update_qty();
        Ok(mat)
    }

    /// Remove the back material.
    pub fn pop_back(&mut self) -> Result<Material, BufferError> {
        let mat = self.mats.pop_back().ok_or(BufferError::Empty)?;
        self.update_qty();
        Ok(mat)
    }

    /// Remove the first `n` materials.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Material>, BufferError> {
        if n > self.mats.len() {
            return Err(BufferError::InsufficientCount {
                have: self.mats.len(),
                need: n,
            });
        }
        let popped = self.mats.drain(..n).collect();
        self.update_qty();
        Ok(popped)
    }

    /// Front material without removing it.
    pub fn peek(&self) -> Result<&Material, BufferError> {
        self.mats.front().ok_or(BufferError::Empty)
    }

    /// Remove `qty` kg from the front as a single material.
    ///
    /// Differences up to `eps` between the request and what the buffer
    /// holds are absorbed: a material within `eps` of the remaining request
    /// is taken whole rather than split. Pieces with different compositions
    /// are mixed.
    pub fn pop_qty(&mut self, qty: f64, eps: f64) -> Result<Material, BufferError> {
        if qty.is_nan() || qty < 0.0 {
            return Err(BufferError::NegativeQuantity(qty));
        }
        if self.mats.is_empty() {
            return Err(BufferError::Empty);
        }
        if qty > self.qty + eps {
            return Err(BufferError::InsufficientQuantity {
                have: self.qty,
                need: qty,
            });
        }

        let mut popped: Vec<Material> = Vec::new();
        let mut left = qty;
        while left > eps {
            let Some(mut front) = self.mats.pop_front() else {
                break;
            };
            if front.quantity() - left > eps {
                let piece = front.extract_qty(left);
                self.mats.push_front(front);
                popped.push(piece?);
                left = 0.0;
            } else {
                left -= front.quantity();
                popped.push(front);
            }
        }
        if popped.is_empty() {
            // Request within eps of zero: hand back an empty piece of the
            // front material.
            if let Some(front) = self.mats.front_mut() {
                popped.push(front.extract_qty(0.0)?);
            }
        }
        self.update_qty();

        let mut pieces = popped.into_iter();
        let mut merged = pieces.next().ok_or(BufferError::Empty)?;
        for piece in pieces {
            merged.absorb(piece)?;
        }
        Ok(merged)
    }

    /// Iterate materials front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Material> + Clone {
        self.mats.iter()
    }

    fn update_qty(&mut self) {
        self.qty = self.mats.iter().map(Material::quantity).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelflow_core::nuclide::Nuc;
    use fuelflow_decay::Composition;

    const U235: Nuc = 922350000;
    const U238: Nuc = 922380000;

    fn mat(qty: f64, nuc: Nuc) -> Material {
        let comp = Composition::create_from_mass([(nuc, 1.0)].into_iter().collect()).unwrap();
        Material::new(qty, comp).unwrap()
    }

    #[test]
    fn push_and_pop_fifo() {
        let mut buf = ResBuf::new();
        buf.push(mat(1.0, U235)).unwrap();
        buf.push(mat(2.0, U238)).unwrap();
        assert_eq!(buf.count(), 2);
        assert_eq!(buf.quantity(), 3.0);
        assert_eq!(buf.pop().unwrap().quantity(), 1.0);
        assert_eq!(buf.pop_back().unwrap().quantity(), 2.0);
        assert!(buf.is_empty());
        assert_eq!(buf.pop().unwrap_err(), BufferError::Empty);
        assert_eq!(buf.quantity(), 0.0);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut buf = ResBuf::with_capacity(5.0).unwrap();
        buf.push(mat(4.0, U235)).unwrap();
        assert_eq!(buf.space(), 1.0);
        let err = buf.push(mat(2.0, U235)).unwrap_err();
        assert_eq!(err, BufferError::CapacityExceeded { space: 1.0, pushed: 2.0 });
        assert!(buf.set_capacity(3.0).is_err());
        assert!(ResBuf::with_capacity(-1.0).is_err());
    }

    #[test]
    fn push_all_is_all_or_nothing() {
        let mut buf = ResBuf::with_capacity(5.0).unwrap();
        assert!(buf.push_all(vec![mat(3.0, U235), mat(3.0, U235)]).is_err());
        assert!(buf.is_empty());
        buf.push_all(vec![mat(3.0, U235), mat(2.0, U235)]).unwrap();
        assert_eq!(buf.count(), 2);
    }

    #[test]
    fn pop_n_checks_count() {
        let mut buf = ResBuf::new();
        buf.push_all(vec![mat(1.0, U235), mat(2.0, U235), mat(3.0, U235)]).unwrap();
        let two = buf.pop_n(2).unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(buf.quantity(), 3.0);
        assert_eq!(
            buf.pop_n(2).unwrap_err(),
            BufferError::InsufficientCount { have: 1, need: 2 }
        );
    }

    #[test]
    fn pop_qty_splits_last_item() {
        let mut buf = ResBuf::new();
        buf.push_all(vec![mat(2.0, U235), mat(5.0, U235)]).unwrap();
        let m = buf.pop_qty(4.0, EPS_RSRC).unwrap();
        assert!((m.quantity() - 4.0).abs() < 1e-12);
        assert_eq!(buf.count(), 1);
        assert!((buf.quantity() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn pop_qty_mixes_compositions() {
        let mut buf = ResBuf::new();
        buf.push_all(vec![mat(1.0, U235), mat(3.0, U238)]).unwrap();
        let m = buf.pop_qty(4.0, EPS_RSRC).unwrap();
        assert!(buf.is_empty());
        let mass = m.comp().mass();
        assert!((mass[&U235] / mass[&U238] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn pop_qty_absorbs_rounding() {
        let mut buf = ResBuf::new();
        buf.push(mat(3.0, U235)).unwrap();
        let m = buf.pop_qty(3.0 + 1e-9, EPS_RSRC).unwrap();
        assert_eq!(m.quantity(), 3.0);
        assert!(buf.is_empty());

        buf.push(mat(3.0, U235)).unwrap();
        let m = buf.pop_qty(3.0 - 1e-9, EPS_RSRC).unwrap();
        assert_eq!(m.quantity(), 3.0);
        assert!(buf.is_empty());
    }

    #[test]
    fn pop_qty_errors() {
        let mut buf = ResBuf::new();
        assert_eq!(buf.pop_qty(1.0, EPS_RSRC).unwrap_err(), BufferError::Empty);
        buf.push(mat(1.0, U235)).unwrap();
        assert_eq!(
            buf.pop_qty(2.0, EPS_RSRC).unwrap_err(),
            BufferError::InsufficientQuantity { have: 1.0, need: 2.0 }
        );
        assert_eq!(
            buf.pop_qty(-1.0, EPS_RSRC).unwrap_err(),
            BufferError::NegativeQuantity(-1.0)
        );
        assert_eq!(buf.quantity(), 1.0);
    }

    #[test]
    fn pop_qty_zero_leaves_buffer() {
        let mut buf = ResBuf::new();
        buf.push(mat(1.0, U235)).unwrap();
        let m = buf.pop_qty(0.0, EPS_RSRC).unwrap();
        assert_eq!(m.quantity(), 0.0);
        assert_eq!(buf.quantity(), 1.0);
    }

    #[test]
    fn peek_does_not_remove() {
        let mut buf = ResBuf::new();
        assert!(buf.peek().is_err());
        buf.push(mat(1.0, U235)).unwrap();
        assert_eq!(buf.peek().unwrap().quantity(), 1.0);
        assert_eq!(buf.count(), 1);
    }
}
