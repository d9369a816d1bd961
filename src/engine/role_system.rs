use super::*;
use crate::constants::{MAX_RESCUERS, RESCUER_CANDIDATES_PER_POI};

/// Picks up to three (firefighter, POI) pairings.
///
/// Each POI nominates its three nearest free firefighters. All nominations
/// are then taken greedily by distance, skipping firefighters already paired.
/// Several rescuers may share a POI. Ties keep input order.
pub fn plan_rescuers(
    pois: &[(PoiId, Cell)],
    firefighters: &[(FirefighterId, Cell)],
) -> Vec<(FirefighterId, PoiId)> {
    let mut candidates: Vec<(i32, FirefighterId, PoiId)> = Vec::new();
    for (poi, poi_cell) in pois {
        let mut nearest: Vec<(i32, FirefighterId)> = firefighters
            .iter()
            .map(|(id, pos)| (pos.manhattan(*poi_cell), *id))
            .collect();
        nearest.sort_by_key(|(distance, _)| *distance);
        candidates.extend(
            nearest
                .into_iter()
                .take(RESCUER_CANDIDATES_PER_POI)
                .map(|(distance, id)| (distance, id, *poi)),
        );
    }
    candidates.sort_by_key(|(distance, _, _)| *distance);

    let mut plan: Vec<(FirefighterId, PoiId)> = Vec::new();
    for (_, id, poi) in candidates {
        if plan.len() >= MAX_RESCUERS {
            break;
        }
        if plan.iter().any(|(taken, _)| *taken == id) {
            continue;
        }
        plan.push((id, poi));
    }
    plan
}

impl GameEngine {
    pub(super) fn assign_roles(&mut self) {
        let pois: Vec<(PoiId, Cell)> = self.pois.placed().map(|(poi, cell)| (poi.id, cell)).collect();
        let free: Vec<(FirefighterId, Cell)> = self
            .firefighters
            .iter()
            .filter(|ff| ff.carrying.is_none())
            .map(|ff| (ff.id, ff.pos))
            .collect();
        let plan = plan_rescuers(&pois, &free);

        let before: Vec<(FirefighterId, Option<PoiId>)> = self.rescuer_targets();
        for ff in self.firefighters.iter_mut().filter(|ff| ff.carrying.is_none()) {
            match plan.iter().find(|(id, _)| *id == ff.id) {
                Some((_, poi)) => {
                    if ff.target != Some(*poi) {
                        ff.path.clear();
                    }
                    ff.role = Role::Rescuer;
                    ff.target = Some(*poi);
                }
                None => {
                    ff.role = Role::Extinguisher;
                    ff.target = None;
                }
            }
        }

        let after = self.rescuer_targets();
        if after != before {
            let rescuers: Vec<FirefighterId> = plan.iter().map(|(id, _)| *id).collect();
            debug!(?rescuers, "roles reassigned");
            self.events.push(GameEvent::RolesAssigned { rescuers });
        }
    }

    fn rescuer_targets(&self) -> Vec<(FirefighterId, Option<PoiId>)> {
        self.firefighters
            .iter()
            .filter(|ff| ff.role == Role::Rescuer)
            .map(|ff| (ff.id, ff.target))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{add_firefighter, open_config, place_poi, quiet_engine};
    use super::*;

    #[test]
    fn nearest_pairs_are_taken_first() {
        let pois = [(1, Cell::new(0, 0)), (2, Cell::new(9, 0))];
        let firefighters = [(0, Cell::new(1, 0)), (1, Cell::new(8, 0)), (2, Cell::new(5, 0))];
        let plan = plan_rescuers(&pois, &firefighters);
        assert_eq!(plan, vec![(0, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn at_most_three_rescuers() {
        let pois: Vec<(PoiId, Cell)> = (0..5).map(|i| (i as PoiId + 1, Cell::new(i * 2, 0))).collect();
        let firefighters: Vec<(FirefighterId, Cell)> =
            (0..5).map(|i| (i as FirefighterId, Cell::new(i * 2, 1))).collect();
        let plan = plan_rescuers(&pois, &firefighters);
        assert_eq!(plan.len(), 3);

        let mut ids: Vec<FirefighterId> = plan.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(plan.iter().all(|(id, poi)| *poi == *id as PoiId + 1));
    }

    #[test]
    fn one_poi_can_draw_three_rescuers() {
        let pois = [(4, Cell::new(0, 0))];
        let firefighters: Vec<(FirefighterId, Cell)> =
            (0..5).map(|i| (i as FirefighterId, Cell::new(i as i32 + 1, 0))).collect();
        assert_eq!(plan_rescuers(&pois, &firefighters), vec![(0, 4), (1, 4), (2, 4)]);
    }

    #[test]
    fn ties_resolve_in_input_order() {
        let pois = [(7, Cell::new(1, 1)), (8, Cell::new(3, 1))];
        let firefighters = [(3, Cell::new(2, 1))];
        assert_eq!(plan_rescuers(&pois, &firefighters), vec![(3, 7)]);
    }

    #[test]
    fn empty_inputs_plan_nothing() {
        assert!(plan_rescuers(&[], &[(0, Cell::new(0, 0))]).is_empty());
        assert!(plan_rescuers(&[(1, Cell::new(0, 0))], &[]).is_empty());
    }

    #[test]
    fn carriers_keep_their_role_and_are_skipped() {
        let mut engine = quiet_engine(open_config(6, 6));
        let carrier = add_firefighter(&mut engine, Cell::new(0, 0));
        let other = add_firefighter(&mut engine, Cell::new(5, 5));
        let carried = engine.pois.force_carry(carrier).expect("victim available");
        engine.firefighters[carrier].carrying = Some(carried);
        engine.firefighters[carrier].role = Role::Rescuer;
        let poi = place_poi(&mut engine, PoiKind::Victim, Cell::new(0, 1));

        engine.assign_roles();

        assert_eq!(engine.firefighters[carrier].role, Role::Rescuer);
        assert_eq!(engine.firefighters[carrier].target, None);
        assert_eq!(engine.firefighters[other].role, Role::Rescuer);
        assert_eq!(engine.firefighters[other].target, Some(poi));
    }

    #[test]
    fn firefighters_beyond_the_cap_become_extinguishers() {
        let mut engine = quiet_engine(open_config(6, 6));
        for x in 0..5 {
            add_firefighter(&mut engine, Cell::new(x, 5));
        }
        place_poi(&mut engine, PoiKind::Victim, Cell::new(0, 0));
        engine.assign_roles();

        let roles: Vec<Role> = engine.firefighters.iter().map(|ff| ff.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Rescuer,
                Role::Rescuer,
                Role::Rescuer,
                Role::Extinguisher,
                Role::Extinguisher
            ]
        );
        assert!(engine.firefighters[3].target.is_none());
        assert!(engine
            .drain_events()
            .iter()
            .any(|event| matches!(event, GameEvent::RolesAssigned { .. })));
    }
}
