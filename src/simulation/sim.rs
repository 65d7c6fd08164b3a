//! The authoritative simulation core (spec component C6): entity store,
//! spawning, movement, firing, and collision for one active game session.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, trace};

use crate::config::GameplaySection;
use crate::protocol::datagram::{EntityState, ServerDatagram};
use crate::simulation::collision::resolve_collisions;
use crate::simulation::entity::{Entity, EntityKind, MovementPattern};
use crate::simulation::patterns::velocity_for;

/// Normalized spawn positions for seats 1..=4 (§4.7).
pub const PLAYER_SPAWN_POSITIONS: [(f32, f32); 4] = [
    (0.125, 0.25),
    (0.125, 0.50),
    (0.125, 0.75),
    (0.175, 0.50),
];

const PLAYER_WIDTH: f32 = 0.03;
const PLAYER_HEIGHT: f32 = 0.05;
const ENEMY_WIDTH: f32 = 0.04;
const ENEMY_HEIGHT: f32 = 0.06;
const PROJECTILE_WIDTH: f32 = 0.012;
const PROJECTILE_HEIGHT: f32 = 0.012;

const PLAYER_MOVE_STEP: f32 = 0.005;
const FRIENDLY_PROJECTILE_SPEED: f32 = 0.008;
const HOSTILE_PROJECTILE_SPEED: f32 = 0.008;

const ENEMY_SPAWN_X: f32 = 0.95;
const ENEMY_SPAWN_Y_MIN: f32 = 0.2;
const ENEMY_SPAWN_Y_MAX: f32 = 0.8;
const DESPAWN_MARGIN: f32 = 0.1;

const BOSS_SPAWN_X: f32 = 0.85;
const BOSS_SPAWN_Y: f32 = 0.5;
const BOSS_Y_MARGIN_TOP: f32 = 50.0 / 1080.0;
const BOSS_Y_MARGIN_BOTTOM: f32 = (1080.0 - 100.0) / 1080.0;

/// Bitmask positions understood by [`Simulation::apply_player_input`].
pub mod input_bit {
    pub const UP: u8 = 1 << 0;
    pub const DOWN: u8 = 1 << 1;
    pub const LEFT: u8 = 1 << 2;
    pub const RIGHT: u8 = 1 << 3;
    pub const FIRE: u8 = 1 << 4;
}

/// Events produced by [`Simulation::client_ping`]: the new seat's
/// `PLAYER_ASSIGNMENT` plus an `ENTITY_CREATE` burst for existing entities.
pub struct PingResponse {
    pub datagrams: Vec<ServerDatagram>,
}

/// Everything a tick produced, for the caller to broadcast.
pub struct TickOutput {
    pub destroyed: Vec<u32>,
    pub entity_update: ServerDatagram,
    pub game_state: ServerDatagram,
}

/// One active game session's authoritative state.
pub struct Simulation {
    gameplay: GameplaySection,
    entities: HashMap<u32, Entity>,
    next_net_id: u32,
    score: u32,
    boss_alive: bool,
    spawn_timer: f32,
    clock: f32,
    seat_net_id: HashMap<u8, u32>,
    bound_seats: HashMap<u8, ()>,
}

impl Simulation {
    /// Instantiate a session with one player per seat in `seats`.
    pub fn new(gameplay: GameplaySection, seats: &[u8]) -> Self {
        let mut sim = Self {
            spawn_timer: gameplay.spawn_interval_initial,
            gameplay,
            entities: HashMap::new(),
            next_net_id: 1,
            score: 0,
            boss_alive: false,
            clock: 0.0,
            seat_net_id: HashMap::new(),
            bound_seats: HashMap::new(),
        };
        for &seat in seats {
            sim.spawn_player(seat);
        }
        sim
    }

    fn alloc_net_id(&mut self) -> u32 {
        let id = self.next_net_id;
        self.next_net_id = self.next_net_id.wrapping_add(1).max(1);
        id
    }

    fn spawn_player(&mut self, seat: u8) {
        let idx = (seat.saturating_sub(1) as usize).min(PLAYER_SPAWN_POSITIONS.len() - 1);
        let (x, y) = PLAYER_SPAWN_POSITIONS[idx];
        let net_id = self.alloc_net_id();
        let mut entity = Entity::new(net_id, EntityKind::Player, x, y, PLAYER_WIDTH, PLAYER_HEIGHT);
        entity.health = self.gameplay.player_default_health;
        entity.owner_seat = seat;
        self.seat_net_id.insert(seat, net_id);
        self.entities.insert(net_id, entity);
    }

    /// Called on `CLIENT_PING` (§4.6 step 1). Binds `seat` to a datagram
    /// endpoint the first time it pings and, regardless, the caller decides
    /// whether to (re)send the full burst based on the returned `is_new`.
    pub fn client_ping(&mut self, seat: u8) -> Option<PingResponse> {
        let net_id = *self.seat_net_id.get(&seat)?;
        if self.bound_seats.insert(seat, ()).is_some() {
            return None;
        }
        debug!(seat, net_id, "bound datagram endpoint for seat");
        let mut datagrams = vec![ServerDatagram::PlayerAssignment { net_id }];
        for entity in self.entities.values() {
            datagrams.push(ServerDatagram::EntityCreate {
                net_id: entity.net_id,
                kind: entity.kind,
                health: entity.health.max(0) as u32,
                pos_x: entity.pos_x,
                pos_y: entity.pos_y,
            });
        }
        Some(PingResponse { datagrams })
    }

    /// Apply one `PLAYER_INPUT` datagram for `seat` (§4.6 step 1).
    pub fn apply_player_input(&mut self, seat: u8, direction: u8) {
        let Some(&net_id) = self.seat_net_id.get(&seat) else {
            trace!(seat, "input for unknown seat ignored");
            return;
        };
        let fire_cooldown = self.gameplay.player_fire_cooldown;
        let clock = self.clock;
        let Some(player) = self.entities.get_mut(&net_id) else {
            return;
        };

        if direction & input_bit::UP != 0 {
            player.pos_y -= PLAYER_MOVE_STEP;
        }
        if direction & input_bit::DOWN != 0 {
            player.pos_y += PLAYER_MOVE_STEP;
        }
        if direction & input_bit::LEFT != 0 {
            player.pos_x -= PLAYER_MOVE_STEP;
        }
        if direction & input_bit::RIGHT != 0 {
            player.pos_x += PLAYER_MOVE_STEP;
        }
        player.pos_x = player.pos_x.clamp(0.0, 1.0);
        player.pos_y = player.pos_y.clamp(0.0, 1.0);

        if direction & input_bit::FIRE != 0 && clock - player.last_fire >= fire_cooldown {
            let spawn_x = player.pos_x + player.width;
            let spawn_y = player.pos_y + player.height / 2.0;
            player.last_fire = clock;
            let net_id_owner = player.owner_seat;
            self.spawn_friendly_projectile(spawn_x, spawn_y, net_id_owner);
        }
    }

    fn spawn_friendly_projectile(&mut self, x: f32, y: f32, owner_seat: u8) {
        let net_id = self.alloc_net_id();
        let mut projectile = Entity::new(
            net_id,
            EntityKind::FriendlyProjectile,
            x,
            y,
            PROJECTILE_WIDTH,
            PROJECTILE_HEIGHT,
        );
        projectile.vel_x = FRIENDLY_PROJECTILE_SPEED;
        projectile.vel_y = 0.0;
        projectile.owner_seat = owner_seat;
        projectile.health = 1;
        self.entities.insert(net_id, projectile);
    }

    /// Advance the simulation by one fixed step of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickOutput {
        self.clock += dt;
        let mut destroyed = Vec::new();

        self.spawn_enemies(dt);
        destroyed.extend(self.update_enemy_ai(dt));
        self.update_boss_ai(dt);
        destroyed.extend(self.update_projectiles());

        let collision = resolve_collisions(&mut self.entities);
        self.score += collision.score_delta;
        if collision.boss_killed {
            self.boss_alive = false;
        }
        for id in collision.destroyed {
            if !destroyed.contains(&id) {
                destroyed.push(id);
            }
        }

        for id in &destroyed {
            self.entities.remove(id);
        }

        let entity_states: Vec<EntityState> = self
            .entities
            .values()
            .map(|e| EntityState {
                net_id: e.net_id,
                health: e.health.max(0) as u32,
                pos_x: e.pos_x,
                pos_y: e.pos_y,
            })
            .collect();

        TickOutput {
            destroyed,
            entity_update: ServerDatagram::EntityUpdate {
                entities: entity_states,
            },
            game_state: ServerDatagram::GameState { score: self.score },
        }
    }

    fn spawn_enemies(&mut self, dt: f32) {
        self.spawn_timer -= dt;
        if self.spawn_timer > 0.0 {
            return;
        }
        self.spawn_timer = (self.gameplay.spawn_interval_initial
            - self.gameplay.spawn_interval_shrink * self.spawn_count_so_far())
        .max(self.gameplay.spawn_interval_floor);

        if self.score >= self.gameplay.boss_score_threshold && !self.boss_alive {
            self.spawn_boss();
            return;
        }
        if self.boss_alive {
            return;
        }

        let mut rng = rand::thread_rng();
        let y = rng.gen_range(ENEMY_SPAWN_Y_MIN..=ENEMY_SPAWN_Y_MAX);
        if rng.gen_bool(0.5) {
            self.spawn_basic_enemy(y);
        } else {
            self.spawn_spread_enemy(y);
        }
    }

    fn spawn_count_so_far(&self) -> f32 {
        // Monotonically shrinks the spawn interval as more enemies are
        // created; approximated from allocated ids rather than a separate
        // counter since both only ever increase.
        self.next_net_id as f32
    }

    fn spawn_basic_enemy(&mut self, y: f32) {
        let net_id = self.alloc_net_id();
        let mut enemy = Entity::new(net_id, EntityKind::BasicEnemy, ENEMY_SPAWN_X, y, ENEMY_WIDTH, ENEMY_HEIGHT);
        enemy.health = 20;
        enemy.movement_pattern = MovementPattern::Wave;
        enemy.pattern_amplitude = self.gameplay.basic_enemy_amplitude;
        enemy.pattern_frequency = self.gameplay.basic_enemy_frequency;
        enemy.pattern_base_speed = self.gameplay.basic_enemy_base_speed;
        enemy.fire_cooldown = 1.0 + rand::thread_rng().gen_range(0.0..1.0);
        enemy.last_fire = self.clock;
        self.entities.insert(net_id, enemy);
    }

    fn spawn_spread_enemy(&mut self, y: f32) {
        let net_id = self.alloc_net_id();
        let mut enemy = Entity::new(net_id, EntityKind::SpreadEnemy, ENEMY_SPAWN_X, y, ENEMY_WIDTH, ENEMY_HEIGHT);
        enemy.health = 30;
        enemy.movement_pattern = MovementPattern::Zigzag;
        enemy.pattern_amplitude = self.gameplay.spread_enemy_amplitude;
        enemy.pattern_frequency = self.gameplay.spread_enemy_frequency;
        enemy.pattern_base_speed = self.gameplay.spread_enemy_base_speed;
        enemy.fire_cooldown = self.gameplay.spread_enemy_fire_cooldown;
        enemy.projectile_count = 3;
        enemy.projectile_angle_spread = 20.0;
        enemy.last_fire = self.clock;
        self.entities.insert(net_id, enemy);
    }

    fn spawn_boss(&mut self) {
        let net_id = self.alloc_net_id();
        let mut boss = Entity::new(
            net_id,
            EntityKind::Boss,
            BOSS_SPAWN_X,
            BOSS_SPAWN_Y,
            self.gameplay.boss_width,
            self.gameplay.boss_height,
        );
        boss.health = self.gameplay.boss_health;
        boss.vel_y = self.gameplay.boss_speed / patterns_reference_height();
        boss.fire_cooldown = self.gameplay.boss_fire_cooldown;
        boss.projectile_count = self.gameplay.boss_projectile_count;
        boss.projectile_angle_spread = self.gameplay.boss_angle_spread;
        boss.last_fire = self.clock;
        self.boss_alive = true;
        self.entities.insert(net_id, boss);
    }

    /// Returns net ids that crossed the left despawn margin this tick, to be
    /// merged into the tick's deferred destroy queue by the caller.
    fn update_enemy_ai(&mut self, dt: f32) -> Vec<u32> {
        let clock = self.clock;
        let mut spawned_projectiles = Vec::new();
        let mut despawn = Vec::new();

        for entity in self.entities.values_mut() {
            if !matches!(entity.kind, EntityKind::BasicEnemy | EntityKind::SpreadEnemy) {
                continue;
            }
            entity.pattern_time += dt;
            let (vx, vy) = velocity_for(
                entity.movement_pattern,
                entity.pos_x,
                entity.pattern_time,
                entity.pattern_amplitude,
                entity.pattern_frequency,
                entity.pattern_base_speed,
            );
            entity.vel_x = vx;
            entity.vel_y = vy;
            entity.pos_x += entity.vel_x * dt;
            entity.pos_y = (entity.pos_y + entity.vel_y * dt).clamp(0.0, 1.0);

            if entity.pos_x < -DESPAWN_MARGIN {
                despawn.push(entity.net_id);
                continue;
            }

            if clock - entity.last_fire >= entity.fire_cooldown {
                entity.last_fire = clock;
                spawned_projectiles.push((
                    entity.pos_x,
                    entity.pos_y,
                    entity.projectile_count,
                    entity.projectile_angle_spread,
                ));
            }
        }

        for (x, y, count, spread) in spawned_projectiles {
            self.spawn_hostile_spread(x, y, count, spread);
        }
        despawn
    }

    fn update_boss_ai(&mut self, dt: f32) {
        let clock = self.clock;
        let mut spawned: Option<(f32, f32, u8, f32)> = None;

        for entity in self.entities.values_mut() {
            if entity.kind != EntityKind::Boss {
                continue;
            }
            entity.pos_y += entity.vel_y * dt;
            if entity.pos_y <= BOSS_Y_MARGIN_TOP || entity.pos_y >= BOSS_Y_MARGIN_BOTTOM {
                entity.vel_y = -entity.vel_y;
                entity.pos_y = entity.pos_y.clamp(BOSS_Y_MARGIN_TOP, BOSS_Y_MARGIN_BOTTOM);
            }
            if clock - entity.last_fire >= entity.fire_cooldown {
                entity.last_fire = clock;
                spawned = Some((
                    entity.pos_x,
                    entity.pos_y,
                    entity.projectile_count,
                    entity.projectile_angle_spread,
                ));
            }
        }

        if let Some((x, y, count, spread)) = spawned {
            self.spawn_hostile_spread(x, y, count, spread);
        }
    }

    fn spawn_hostile_spread(&mut self, x: f32, y: f32, count: u8, total_spread_deg: f32) {
        if count == 0 {
            return;
        }
        let base_angle = -total_spread_deg * (f32::from(count) - 1.0) / 2.0;
        for i in 0..count {
            let angle_deg = base_angle + total_spread_deg * f32::from(i);
            let angle = angle_deg.to_radians();
            let net_id = self.alloc_net_id();
            let mut projectile = Entity::new(
                net_id,
                EntityKind::HostileProjectile,
                x,
                y,
                PROJECTILE_WIDTH,
                PROJECTILE_HEIGHT,
            );
            let vx = -HOSTILE_PROJECTILE_SPEED * angle.cos().abs();
            let vy = HOSTILE_PROJECTILE_SPEED * angle.sin();
            projectile.vel_x = vx.min(0.0);
            projectile.vel_y = vy;
            projectile.health = 1;
            self.entities.insert(net_id, projectile);
        }
    }

    /// Projectile motion (§4.6 step 5): positions advance by the raw
    /// velocity with no `dt` scaling, matching the reference behavior.
    /// Returns net ids that left the screen, to be merged into the tick's
    /// deferred destroy queue by the caller.
    fn update_projectiles(&mut self) -> Vec<u32> {
        let mut despawn = Vec::new();
        for entity in self.entities.values_mut() {
            if !entity.kind.is_projectile() {
                continue;
            }
            entity.pos_x += entity.vel_x;
            entity.pos_y += entity.vel_y;
            if entity.pos_x < -DESPAWN_MARGIN || entity.pos_x > 1.0 + DESPAWN_MARGIN {
                despawn.push(entity.net_id);
            }
        }
        despawn
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entity(&self, net_id: u32) -> Option<&Entity> {
        self.entities.get(&net_id)
    }

    pub fn player_net_id(&self, seat: u8) -> Option<u32> {
        self.seat_net_id.get(&seat).copied()
    }
}

fn patterns_reference_height() -> f32 {
    crate::simulation::patterns::REFERENCE_HEIGHT
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

    fn gameplay() -> GameplaySection {
        GameplaySection::default()
    }

    #[test]
    fn spawns_one_player_per_seat() {
        let sim = Simulation::new(gameplay(), &[1, 2]);
        assert_eq!(sim.entity_count(), 2);
        assert!(sim.player_net_id(1).is_some());
        assert!(sim.player_net_id(2).is_some());
    }

    #[test]
    fn first_ping_binds_and_returns_burst() {
        let mut sim = Simulation::new(gameplay(), &[1]);
        let response = sim.client_ping(1).unwrap();
        assert!(!response.datagrams.is_empty());
        assert!(sim.client_ping(1).is_none());
    }

    #[test]
    fn movement_input_translates_player_right() {
        let mut sim = Simulation::new(gameplay(), &[1]);
        let net_id = sim.player_net_id(1).unwrap();
        let before = sim.entity(net_id).unwrap().pos_x;
        sim.apply_player_input(1, input_bit::RIGHT);
        let after = sim.entity(net_id).unwrap().pos_x;
        assert!((after - (before + PLAYER_MOVE_STEP)).abs() < 1e-6);
    }

    #[test]
    fn fire_input_spawns_friendly_projectile_respecting_cooldown() {
        let mut sim = Simulation::new(gameplay(), &[1]);
        let before = sim.entity_count();
        sim.apply_player_input(1, input_bit::FIRE);
        assert_eq!(sim.entity_count(), before + 1);
        // Second shot immediately after should be withheld by the cooldown.
        sim.apply_player_input(1, input_bit::FIRE);
        assert_eq!(sim.entity_count(), before + 1);
    }

    #[test]
    fn enemy_despawns_past_left_edge() {
        let mut sim = Simulation::new(gameplay(), &[]);
        sim.spawn_basic_enemy(0.5);
        let (&net_id, _) = sim.entities.iter().next().unwrap();
        if let Some(e) = sim.entities.get_mut(&net_id) {
            e.pos_x = -0.2;
        }
        let output = sim.tick(1.0 / 30.0);
        assert!(output.destroyed.contains(&net_id));
        assert!(sim.entity(net_id).is_none());
    }

    #[test]
    fn boss_spawns_once_score_threshold_reached() {
        let mut sim = Simulation::new(gameplay(), &[]);
        sim.score = sim.gameplay.boss_score_threshold;
        sim.spawn_timer = 0.0;
        sim.tick(1.0 / 30.0);
        assert!(sim.entities.values().any(|e| e.kind == EntityKind::Boss));
        assert!(sim.boss_alive);
    }
}
