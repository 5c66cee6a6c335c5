//! Troop categories
//!
//! Every involved unit of a side sits in exactly one of three categories:
//! the firing line, the artillery, or the passive pool (broken formations,
//! support elements and uncommitted reserves).

use serde::{Deserialize, Serialize};

use crate::core::arena::Arena;
use crate::core::config::CombatConfig;
use crate::core::types::{DetachmentId, Side};
use crate::combat::engagement::CombatKind;
use crate::force::{Armory, Detachment, DetachmentKind, Mode, Unit, UnitRole};

/// Role bucket of an involved unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    Line,
    Artillery,
    Passive,
}

impl CategoryKind {
    /// Decide where a unit fights. Returns the category and whether the
    /// unit is an uncommitted reserve that `dress_line` may pull forward.
    ///
    /// Outside a Meeting only the defender holding the front starts in the
    /// line; every other defender waits in reserve.
    pub fn classify(
        side: Side,
        kind: CombatKind,
        det: &Detachment,
        unit: &Unit,
        front: bool,
    ) -> (Self, bool) {
        if det.mode.is_broken() || det.kind != DetachmentKind::Combat || unit.role == UnitRole::Support
        {
            return (CategoryKind::Passive, false);
        }
        if unit.role == UnitRole::Artillery {
            return (CategoryKind::Artillery, false);
        }
        match side {
            Side::Attacker => (CategoryKind::Line, false),
            Side::Defender if kind == CombatKind::Meeting => (CategoryKind::Line, false),
            Side::Defender if front && det.mode == Mode::Defending => (CategoryKind::Line, false),
            Side::Defender => (CategoryKind::Passive, true),
        }
    }
}

/// An atomic unit committed to a combat, addressed by detachment and index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvolvedUnit {
    pub detachment: DetachmentId,
    pub unit: usize,
    /// Items this unit offers as targets in the current pass
    pub target_count: u32,
    pub reserve: bool,
}

impl InvolvedUnit {
    pub fn new(detachment: DetachmentId, unit: usize, reserve: bool) -> Self {
        Self {
            detachment,
            unit,
            target_count: 0,
            reserve,
        }
    }

    pub fn resolve<'a>(
        &self,
        detachments: &'a Arena<DetachmentId, Detachment>,
    ) -> Option<&'a Unit> {
        detachments
            .get(self.detachment)
            .and_then(|d| d.units.get(self.unit))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopCategory {
    pub kind: CategoryKind,
    units: Vec<InvolvedUnit>,
    target_count: u32,
}

impl TroopCategory {
    pub fn new(kind: CategoryKind) -> Self {
        Self {
            kind,
            units: Vec::new(),
            target_count: 0,
        }
    }

    pub fn push(&mut self, unit: InvolvedUnit) {
        self.units.push(unit);
    }

    /// Take a unit out of the category (order is not preserved)
    pub fn take(&mut self, index: usize) -> Option<InvolvedUnit> {
        (index < self.units.len()).then(|| self.units.swap_remove(index))
    }

    /// Take every unit of a detachment out; returns how many left
    pub fn remove_detachment(&mut self, detachment: DetachmentId) -> usize {
        let before = self.units.len();
        self.units.retain(|u| u.detachment != detachment);
        before - self.units.len()
    }

    pub fn clear(&mut self) {
        self.units.clear();
        self.target_count = 0;
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvolvedUnit> {
        self.units.iter()
    }

    /// Indices of uncommitted reserves
    pub fn reserves(&self) -> Vec<usize> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.reserve)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn contains(&self, detachment: DetachmentId, unit: usize) -> bool {
        self.units
            .iter()
            .any(|u| u.detachment == detachment && u.unit == unit)
    }

    /// Recount the items each unit offers as targets
    ///
    /// Must run before any loss pass. Returns the category total, which is
    /// always the sum of the individual counts.
    pub fn calculate_target_count(&mut self, detachments: &Arena<DetachmentId, Detachment>) -> u32 {
        let mut total = 0;
        for involved in &mut self.units {
            involved.target_count = involved.resolve(detachments).map_or(0, |u| u.strength());
            total += involved.target_count;
        }
        self.target_count = total;
        total
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    /// Direct-fire power the category would put out, ignoring doctrine
    ///
    /// Used to project density while pulling reserves into line.
    pub fn projected_power(
        &self,
        detachments: &Arena<DetachmentId, Detachment>,
        armory: &Armory,
        config: &CombatConfig,
    ) -> f64 {
        self.units
            .iter()
            .filter_map(|u| u.resolve(detachments))
            .map(|u| unit_direct_power(u, armory, config))
            .sum()
    }
}

/// Direct-fire power of one unit at full rates
pub fn unit_direct_power(unit: &Unit, armory: &Armory, config: &CombatConfig) -> f64 {
    unit.equipment
        .iter()
        .filter_map(|e| armory.get(e.weapon).map(|w| (w, e.on_hand as f64)))
        .map(|(w, n)| n * (w.ap_rate * config.ap_power + w.at_rate * config.at_power))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ForceId;
    use crate::map::HexCoord;

    fn setup() -> (Arena<DetachmentId, Detachment>, DetachmentId, Armory) {
        let armory = Armory::standard();
        let rifles = armory.find("rifle squad").unwrap();
        let guns = armory.find("field howitzer").unwrap();
        let mut arena = Arena::new();
        let id = arena.insert_with(|id| {
            Detachment::new(id, "2nd Bn", ForceId(1), HexCoord::new(0, 0))
                .with_unit(Unit::new("A Coy", UnitRole::Infantry).with(rifles, 9))
                .with_unit(Unit::new("B Bty", UnitRole::Artillery).with(guns, 4))
        });
        (arena, id, armory)
    }

    #[test]
    fn test_classification() {
        let (arena, id, _) = setup();
        let det = arena.get(id).unwrap();
        let infantry = &det.units[0];
        let guns = &det.units[1];

        assert_eq!(
            CategoryKind::classify(Side::Attacker, CombatKind::Assault, det, infantry, false),
            (CategoryKind::Line, false)
        );
        assert_eq!(
            CategoryKind::classify(Side::Defender, CombatKind::Infiltration, det, infantry, false),
            (CategoryKind::Passive, true)
        );
        assert_eq!(
            CategoryKind::classify(Side::Defender, CombatKind::Meeting, det, infantry, false),
            (CategoryKind::Line, false)
        );
        assert_eq!(
            CategoryKind::classify(Side::Defender, CombatKind::Assault, det, guns, false),
            (CategoryKind::Artillery, false)
        );

        let disrupted = det.clone().with_mode(Mode::Disrupted);
        assert_eq!(
            CategoryKind::classify(Side::Attacker, CombatKind::Assault, &disrupted, infantry, true),
            (CategoryKind::Passive, false)
        );

        let dug_in = det.clone().with_mode(Mode::Defending);
        assert_eq!(
            CategoryKind::classify(Side::Defender, CombatKind::Assault, &dug_in, infantry, true),
            (CategoryKind::Line, false)
        );
        assert_eq!(
            CategoryKind::classify(Side::Defender, CombatKind::Assault, &dug_in, infantry, false),
            (CategoryKind::Passive, true)
        );
    }

    #[test]
    fn test_target_count_sums_units() {
        let (arena, id, _) = setup();
        let mut category = TroopCategory::new(CategoryKind::Line);
        category.push(InvolvedUnit::new(id, 0, false));
        category.push(InvolvedUnit::new(id, 1, false));

        let total = category.calculate_target_count(&arena);
        assert_eq!(total, 13);
        assert_eq!(category.iter().map(|u| u.target_count).sum::<u32>(), total);
    }

    #[test]
    fn test_take_and_reserves() {
        let (_, id, _) = setup();
        let mut category = TroopCategory::new(CategoryKind::Passive);
        category.push(InvolvedUnit::new(id, 0, false));
        category.push(InvolvedUnit::new(id, 1, true));

        assert_eq!(category.reserves(), vec![1]);
        let taken = category.take(1).unwrap();
        assert!(taken.reserve);
        assert!(category.take(5).is_none());
        assert_eq!(category.len(), 1);
    }

    #[test]
    fn test_projected_power_counts_direct_fire_only() {
        let (arena, id, armory) = setup();
        let config = CombatConfig::default();
        let mut category = TroopCategory::new(CategoryKind::Line);
        category.push(InvolvedUnit::new(id, 1, false));
        assert_eq!(category.projected_power(&arena, &armory, &config), 0.0);

        category.push(InvolvedUnit::new(id, 0, false));
        let power = category.projected_power(&arena, &armory, &config);
        assert!((power - 9.0 * 0.3).abs() < 1e-9);
    }
}
