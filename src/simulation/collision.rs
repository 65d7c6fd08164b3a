//! AABB collision resolution and damage routing (§4.6 step 6).

use std::collections::HashMap;

use crate::simulation::entity::{Entity, EntityKind};

/// Damage dealt by a friendly projectile to an enemy or boss.
pub const FRIENDLY_PROJECTILE_DAMAGE: i32 = 10;
/// Damage dealt by a hostile projectile to a player.
pub const HOSTILE_PROJECTILE_DAMAGE: i32 = 20;
/// Damage dealt to both parties on an enemy-body/player collision.
pub const ENEMY_BODY_DAMAGE: i32 = 30;

/// Score awarded for destroying a basic or spread enemy.
pub const SCORE_BASIC_ENEMY: u32 = 10;
/// Score awarded for destroying the boss.
pub const SCORE_BOSS: u32 = 1000;

/// Outcome of one tick's collision pass.
#[derive(Debug, Default)]
pub struct CollisionOutcome {
    /// Net ids destroyed this tick (health reached zero).
    pub destroyed: Vec<u32>,
    /// Score gained this tick.
    pub score_delta: u32,
    /// Whether the boss was among the destroyed entities.
    pub boss_killed: bool,
}

/// Subtract `amount` from `entity`'s health, clamped at zero. Returns `true`
/// if this reduced health to exactly zero (a kill).
fn apply_damage(entity: &mut Entity, amount: i32) -> bool {
    let before = entity.health;
    entity.health = (entity.health - amount).max(0);
    before > 0 && entity.health == 0
}

/// Test every unordered pair of entities for AABB overlap and apply the
/// relevant damage rule. Deferred destruction: callers flush `destroyed`
/// from the store once per tick, after this pass completes.
pub fn resolve_collisions(entities: &mut HashMap<u32, Entity>) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();
    let ids: Vec<u32> = entities.keys().copied().collect();

    for (i, &id_a) in ids.iter().enumerate() {
        for &id_b in &ids[i + 1..] {
            if outcome.destroyed.contains(&id_a) {
                break;
            }
            if outcome.destroyed.contains(&id_b) {
                continue;
            }
            let Some((kind_a, kind_b, overlaps)) = pair_kinds_and_overlap(entities, id_a, id_b) else {
                continue;
            };
            if !overlaps {
                continue;
            }
            apply_pair_damage(entities, id_a, kind_a, id_b, kind_b, &mut outcome);
        }
    }
    outcome
}

fn pair_kinds_and_overlap(
    entities: &HashMap<u32, Entity>,
    id_a: u32,
    id_b: u32,
) -> Option<(EntityKind, EntityKind, bool)> {
    let a = entities.get(&id_a)?;
    let b = entities.get(&id_b)?;
    Some((a.kind, b.kind, a.aabb_overlaps(b)))
}

fn apply_pair_damage(
    entities: &mut HashMap<u32, Entity>,
    id_a: u32,
    kind_a: EntityKind,
    id_b: u32,
    kind_b: EntityKind,
    outcome: &mut CollisionOutcome,
) {
    use EntityKind::*;

    let damage_case = match (kind_a, kind_b) {
        (FriendlyProjectile, BasicEnemy | SpreadEnemy | Boss) => Some((id_a, id_b)),
        (BasicEnemy | SpreadEnemy | Boss, FriendlyProjectile) => Some((id_b, id_a)),
        _ => None,
    };
    if let Some((projectile_id, target_id)) = damage_case {
        entities.remove(&projectile_id);
        outcome.destroyed.push(projectile_id);
        if let Some(target) = entities.get_mut(&target_id) {
            let killed = apply_damage(target, FRIENDLY_PROJECTILE_DAMAGE);
            finish_kill(entities, target_id, killed, outcome);
        }
        return;
    }

    let hostile_case = match (kind_a, kind_b) {
        (HostileProjectile, Player) => Some((id_a, id_b)),
        (Player, HostileProjectile) => Some((id_b, id_a)),
        _ => None,
    };
    if let Some((projectile_id, player_id)) = hostile_case {
        entities.remove(&projectile_id);
        outcome.destroyed.push(projectile_id);
        if let Some(player) = entities.get_mut(&player_id) {
            let killed = apply_damage(player, HOSTILE_PROJECTILE_DAMAGE);
            finish_kill(entities, player_id, killed, outcome);
        }
        return;
    }

    let body_case = match (kind_a, kind_b) {
        (BasicEnemy | SpreadEnemy | Boss, Player) => Some((id_a, id_b)),
        (Player, BasicEnemy | SpreadEnemy | Boss) => Some((id_b, id_a)),
        _ => None,
    };
    if let Some((enemy_id, player_id)) = body_case {
        let enemy_killed = entities
            .get_mut(&enemy_id)
            .map(|e| apply_damage(e, ENEMY_BODY_DAMAGE))
            .unwrap_or(false);
        let player_killed = entities
            .get_mut(&player_id)
            .map(|e| apply_damage(e, ENEMY_BODY_DAMAGE))
            .unwrap_or(false);
        finish_kill(entities, enemy_id, enemy_killed, outcome);
        finish_kill(entities, player_id, player_killed, outcome);
    }
}

fn finish_kill(entities: &mut HashMap<u32, Entity>, id: u32, killed: bool, outcome: &mut CollisionOutcome) {
    if !killed {
        return;
    }
    let kind = entities.get(&id).map(|e| e.kind);
    outcome.destroyed.push(id);
    match kind {
        Some(EntityKind::BasicEnemy) | Some(EntityKind::SpreadEnemy) => {
            outcome.score_delta += SCORE_BASIC_ENEMY;
        }
        Some(EntityKind::Boss) => {
            outcome.score_delta += SCORE_BOSS;
            outcome.boss_killed = true;
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn entity_at(id: u32, kind: EntityKind, x: f32, y: f32, health: i32) -> Entity {
        let mut e = Entity::new(id, kind, x, y, 0.05, 0.05);
        e.health = health;
        e
    }

    #[test]
    fn friendly_projectile_damages_enemy_and_is_destroyed() {
        let mut entities = HashMap::new();
        entities.insert(1, entity_at(1, EntityKind::FriendlyProjectile, 0.5, 0.5, 1));
        entities.insert(2, entity_at(2, EntityKind::BasicEnemy, 0.5, 0.5, 20));

        let outcome = resolve_collisions(&mut entities);

        assert!(!entities.contains_key(&1));
        assert_eq!(entities.get(&2).unwrap().health, 10);
        assert_eq!(outcome.destroyed, vec![1]);
        assert_eq!(outcome.score_delta, 0);
    }

    #[test]
    fn enemy_destroyed_awards_score() {
        let mut entities = HashMap::new();
        entities.insert(1, entity_at(1, EntityKind::FriendlyProjectile, 0.5, 0.5, 1));
        entities.insert(2, entity_at(2, EntityKind::BasicEnemy, 0.5, 0.5, 10));

        let outcome = resolve_collisions(&mut entities);

        assert!(!entities.contains_key(&2));
        assert_eq!(outcome.score_delta, SCORE_BASIC_ENEMY);
    }

    #[test]
    fn boss_destroyed_awards_boss_score() {
        let mut entities = HashMap::new();
        entities.insert(1, entity_at(1, EntityKind::FriendlyProjectile, 0.5, 0.5, 1));
        entities.insert(2, entity_at(2, EntityKind::Boss, 0.5, 0.5, 10));

        let outcome = resolve_collisions(&mut entities);

        assert!(outcome.boss_killed);
        assert_eq!(outcome.score_delta, SCORE_BOSS);
    }

    #[test]
    fn enemy_body_damages_both_sides() {
        let mut entities = HashMap::new();
        entities.insert(1, entity_at(1, EntityKind::Player, 0.5, 0.5, 100));
        entities.insert(2, entity_at(2, EntityKind::BasicEnemy, 0.5, 0.5, 100));

        resolve_collisions(&mut entities);

        assert_eq!(entities.get(&1).unwrap().health, 70);
        assert_eq!(entities.get(&2).unwrap().health, 70);
    }

    #[test]
    fn non_overlapping_entities_are_unaffected() {
        let mut entities = HashMap::new();
        entities.insert(1, entity_at(1, EntityKind::FriendlyProjectile, 0.1, 0.1, 1));
        entities.insert(2, entity_at(2, EntityKind::BasicEnemy, 0.9, 0.9, 10));

        let outcome = resolve_collisions(&mut entities);
        assert!(outcome.destroyed.is_empty());
    }
}
