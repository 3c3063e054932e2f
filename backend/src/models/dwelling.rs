//! Dwelling model
//!
//! The housing stock. `DwellingType` partitions dwellings into seller types
//! for the housing market.

use crate::repository::{Entity, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DwellingType {
    #[default]
    Detached,
    SemiDetached,
    Attached,
    ApartmentLow,
    ApartmentHigh,
}

impl DwellingType {
    /// Every type, in seller-type order
    pub const ALL: [DwellingType; 5] = [
        DwellingType::Detached,
        DwellingType::SemiDetached,
        DwellingType::Attached,
        DwellingType::ApartmentLow,
        DwellingType::ApartmentHigh,
    ];

    /// Seller-type index of this type
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dwelling {
    pub dwelling_type: DwellingType,
    pub rooms: u32,
    /// Last transaction value
    pub value: f64,
    /// Occupying household
    pub household: Option<EntityId>,
    /// False once demolished or not yet built
    pub exists: bool,
}

impl Dwelling {
    pub fn new(dwelling_type: DwellingType, rooms: u32, value: f64) -> Self {
        Self {
            dwelling_type,
            rooms,
            value,
            household: None,
            exists: true,
        }
    }

    pub fn is_vacant(&self) -> bool {
        self.exists && self.household.is_none()
    }
}

impl Entity for Dwelling {
    fn being_removed(&mut self, _id: EntityId) {
        self.household = None;
        self.exists = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_index_matches_order() {
        for (i, ty) in DwellingType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
    }

    #[test]
    fn test_vacancy() {
        let mut d = Dwelling::new(DwellingType::Attached, 3, 250_000.0);
        assert!(d.is_vacant());
        d.household = Some(EntityId(4));
        assert!(!d.is_vacant());
        assert!(!Dwelling::default().is_vacant());
    }
}
