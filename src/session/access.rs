//! Per-session visibility cache.
//!
//! A non-admin session only hears about regions in estates its user owns
//! or manages. The filter is derived from estate membership and kept up to
//! date from estate notifications; it decides push delivery only; command
//! handlers re-check against the store.

use std::collections::{HashMap, HashSet};

use grid_proto::{Estate, EstateId, UserId};
use uuid::Uuid;

/// Whether a region or estate may be pushed to a session.
#[derive(Debug, Clone)]
pub enum Visibility {
    /// Admin sessions see everything and never consult a filter.
    Everything,
    Filtered(AccessFilter),
}

impl Visibility {
    /// Build the visibility for `user` from the current estates.
    pub fn for_user(user: UserId, admin: bool, estates: &[Estate]) -> Self {
        if admin {
            Self::Everything
        } else {
            Self::Filtered(AccessFilter::build(user, estates))
        }
    }

    pub fn region_visible(&self, region: &Uuid) -> bool {
        match self {
            Self::Everything => true,
            Self::Filtered(filter) => filter.region_visible(region),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Everything)
    }
}

/// Latest membership and management flag of every estate the session knows.
///
/// Regions of unmanaged estates stay recorded under their estate, so "known
/// and hidden" is distinct from "never heard of". The visible-region set is
/// recomputed whenever an estate entry changes.
#[derive(Debug, Clone, Default)]
pub struct AccessFilter {
    user: UserId,
    estates: HashMap<EstateId, EstateEntry>,
    visible: HashSet<Uuid>,
}

#[derive(Debug, Clone, Default)]
struct EstateEntry {
    managed: bool,
    regions: HashSet<Uuid>,
}

impl AccessFilter {
    pub fn build(user: UserId, estates: &[Estate]) -> Self {
        let mut filter = Self {
            user,
            ..Self::default()
        };
        for estate in estates {
            filter.estates.insert(
                estate.id,
                EstateEntry {
                    managed: estate.is_managed_by(user),
                    regions: estate.regions.iter().copied().collect(),
                },
            );
        }
        filter.recompute();
        filter
    }

    /// Fold an estate update in. Returns whether the user manages it.
    pub fn apply_estate(&mut self, estate: &Estate) -> bool {
        let managed = estate.is_managed_by(self.user);
        self.estates.insert(
            estate.id,
            EstateEntry {
                managed,
                regions: estate.regions.iter().copied().collect(),
            },
        );
        self.recompute();
        managed
    }

    /// Mark a removed estate unmanaged; its regions become hidden.
    pub fn remove_estate(&mut self, estate: EstateId) {
        self.estates.entry(estate).or_default().managed = false;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.visible = self
            .estates
            .values()
            .filter(|e| e.managed)
            .flat_map(|e| e.regions.iter().copied())
            .collect();
    }

    pub fn estate_managed(&self, estate: EstateId) -> bool {
        self.estates.get(&estate).is_some_and(|e| e.managed)
    }

    pub fn region_visible(&self, region: &Uuid) -> bool {
        self.visible.contains(region)
    }

    /// Whether any known estate lists the region.
    pub fn knows_region(&self, region: &Uuid) -> bool {
        self.estates.values().any(|e| e.regions.contains(region))
    }

    /// Every visible region.
    pub fn visible_regions(&self) -> impl Iterator<Item = &Uuid> {
        self.visible.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estate(id: EstateId, owner: UserId, managers: Vec<UserId>, regions: &[u128]) -> Estate {
        Estate {
            id,
            name: format!("e{id}"),
            owner,
            managers,
            regions: regions.iter().map(|r| Uuid::from_u128(*r)).collect(),
        }
    }

    fn visible(filter: &AccessFilter) -> HashSet<Uuid> {
        filter.visible_regions().copied().collect()
    }

    fn expected(user: UserId, estates: &[Estate]) -> HashSet<Uuid> {
        estates
            .iter()
            .filter(|e| e.is_managed_by(user))
            .flat_map(|e| e.regions.iter().copied())
            .collect()
    }

    #[test]
    fn build_marks_unmanaged_regions_explicitly() {
        let u1 = Uuid::new_v4();
        let other = Uuid::new_v4();
        let estates = vec![
            estate(1, u1, vec![], &[1, 2]),
            estate(2, other, vec![], &[3]),
            estate(3, other, vec![u1], &[4]),
        ];
        let filter = AccessFilter::build(u1, &estates);
        assert_eq!(visible(&filter), expected(u1, &estates));
        assert!(filter.knows_region(&Uuid::from_u128(3)));
        assert!(!filter.region_visible(&Uuid::from_u128(3)));
        assert!(!filter.knows_region(&Uuid::from_u128(99)));
    }

    #[test]
    fn estate_update_revokes_and_grants() {
        let u1 = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut filter = AccessFilter::build(u1, &[estate(1, other, vec![u1], &[1])]);
        assert!(filter.region_visible(&Uuid::from_u128(1)));

        assert!(!filter.apply_estate(&estate(1, other, vec![], &[1])));
        assert!(!filter.region_visible(&Uuid::from_u128(1)));

        assert!(filter.apply_estate(&estate(1, u1, vec![], &[1, 5])));
        assert!(filter.region_visible(&Uuid::from_u128(5)));
    }

    #[test]
    fn estate_removal_hides_its_regions() {
        let u1 = Uuid::new_v4();
        let mut filter = AccessFilter::build(u1, &[estate(1, u1, vec![], &[1])]);
        filter.remove_estate(1);
        assert!(!filter.estate_managed(1));
        assert_eq!(visible(&filter).len(), 0);
    }

    #[test]
    fn region_move_is_order_independent() {
        let u1 = Uuid::new_v4();
        let other = Uuid::new_v4();
        let managed_before = estate(1, u1, vec![], &[]);
        let unmanaged_before = estate(2, other, vec![], &[7]);
        // Region 7 moves from the unmanaged estate 2 into the managed estate 1.
        let managed_after = estate(1, u1, vec![], &[7]);
        let unmanaged_after = estate(2, other, vec![], &[]);
        let start = [managed_before, unmanaged_before];

        let mut a = AccessFilter::build(u1, &start);
        a.apply_estate(&managed_after);
        a.apply_estate(&unmanaged_after);

        let mut b = AccessFilter::build(u1, &start);
        b.apply_estate(&unmanaged_after);
        b.apply_estate(&managed_after);

        let end = [managed_after.clone(), unmanaged_after.clone()];
        assert_eq!(visible(&a), expected(u1, &end));
        assert_eq!(visible(&b), expected(u1, &end));
    }

    #[test]
    fn filter_matches_ownership_for_every_update_ordering() {
        let u = Uuid::new_v4();
        let other = Uuid::new_v4();
        let updates = [
            estate(1, u, vec![], &[1, 2]),
            estate(2, other, vec![u], &[3]),
            estate(1, other, vec![], &[1]),
            estate(2, other, vec![], &[3, 2]),
            estate(3, u, vec![], &[4]),
        ];
        // Walk every permutation of the updates and compare against a
        // from-scratch recomputation after each step.
        let mut order: Vec<usize> = (0..updates.len()).collect();
        permute(&mut order, 0, &mut |perm| {
            let mut filter = AccessFilter::build(u, &[]);
            let mut latest: HashMap<EstateId, Estate> = HashMap::new();
            for &i in perm {
                let e = &updates[i];
                filter.apply_estate(e);
                latest.insert(e.id, e.clone());
                let current: Vec<Estate> = latest.values().cloned().collect();
                assert_eq!(visible(&filter), expected(u, &current));
            }
        });
    }

    fn permute(items: &mut Vec<usize>, k: usize, f: &mut impl FnMut(&[usize])) {
        if k == items.len() {
            f(items);
            return;
        }
        for i in k..items.len() {
            items.swap(k, i);
            permute(items, k + 1, f);
            items.swap(k, i);
        }
    }
}
