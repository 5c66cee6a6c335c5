//! Per-weapon equipment counts for reporting and loss application

use serde::{Deserialize, Serialize};

use crate::force::equipment::WeaponId;

/// On-hand and authorized counts, indexed by weapon
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub on_hand: Vec<u32>,
    pub authorized: Vec<u32>,
}

impl Tally {
    /// An all-zero tally sized for `weapons` weapon types
    pub fn new(weapons: usize) -> Self {
        Self {
            on_hand: vec![0; weapons],
            authorized: vec![0; weapons],
        }
    }

    fn ensure(&mut self, weapon: WeaponId) {
        if weapon.0 >= self.on_hand.len() {
            self.on_hand.resize(weapon.0 + 1, 0);
            self.authorized.resize(weapon.0 + 1, 0);
        }
    }

    pub fn add(&mut self, weapon: WeaponId, on_hand: u32, authorized: u32) {
        self.ensure(weapon);
        self.on_hand[weapon.0] += on_hand;
        self.authorized[weapon.0] += authorized;
    }

    /// Fold another tally into this one
    pub fn merge(&mut self, other: &Tally) {
        for (i, (&on_hand, &authorized)) in other.on_hand.iter().zip(&other.authorized).enumerate() {
            self.add(WeaponId(i), on_hand, authorized);
        }
    }

    pub fn clear(&mut self) {
        self.on_hand.iter_mut().for_each(|n| *n = 0);
        self.authorized.iter_mut().for_each(|n| *n = 0);
    }

    pub fn on_hand(&self, weapon: WeaponId) -> u32 {
        self.on_hand.get(weapon.0).copied().unwrap_or(0)
    }

    pub fn authorized(&self, weapon: WeaponId) -> u32 {
        self.authorized.get(weapon.0).copied().unwrap_or(0)
    }

    pub fn total_on_hand(&self) -> u32 {
        self.on_hand.iter().sum()
    }

    pub fn total_authorized(&self) -> u32 {
        self.authorized.iter().sum()
    }

    /// Equipment missing from authorized strength, per weapon
    pub fn shortfall(&self) -> Vec<u32> {
        self.authorized
            .iter()
            .zip(&self.on_hand)
            .map(|(a, h)| a.saturating_sub(*h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_grows() {
        let mut tally = Tally::new(2);
        tally.add(WeaponId(4), 3, 5);
        assert_eq!(tally.on_hand.len(), 5);
        assert_eq!(tally.on_hand(WeaponId(4)), 3);
        assert_eq!(tally.authorized(WeaponId(4)), 5);
        assert_eq!(tally.on_hand(WeaponId(9)), 0);
    }

    #[test]
    fn test_merge_and_shortfall() {
        let mut a = Tally::new(3);
        a.add(WeaponId(0), 8, 10);
        let mut b = Tally::new(3);
        b.add(WeaponId(0), 2, 2);
        b.add(WeaponId(2), 1, 4);
        a.merge(&b);

        assert_eq!(a.total_on_hand(), 11);
        assert_eq!(a.total_authorized(), 16);
        assert_eq!(a.shortfall(), vec![2, 0, 3]);

        a.clear();
        assert_eq!(a.total_on_hand(), 0);
    }
}
