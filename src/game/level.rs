//! Level data: templates, the exploration hub, and exemption data
//!
//! Levels are plain data. `LevelCatalog::generate` builds a deterministic
//! catalogue from a seed; callers with real inventory data use `from_parts`.

use hashbrown::{HashMap, HashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::constants::{boss, exploration, hostile, level, player, quest, third_party};
use crate::game::entity::{AdversaryBehavior, AttackPattern, EntityKind, Identity};
use crate::game::quest::QuestDefinition;
use crate::game::world::Arena;
use crate::util::vec2::{Rect, Vec2};

pub type LevelId = u32;

/// One entity in a level's initial population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpec {
    pub kind: EntityKind,
    pub identity: Identity,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossSpec {
    pub pattern: AttackPattern,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTemplate {
    pub id: LevelId,
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub ground_y: f32,
    /// Player start and reset point
    pub entry: Vec2,
    /// Touching this region leaves the level
    pub exit: Rect,
    pub spawns: Vec<SpawnSpec>,
    pub quest: Option<QuestDefinition>,
    pub boss: BossSpec,
}

impl LevelTemplate {
    pub fn arena(&self) -> Arena {
        Arena {
            width: self.width,
            height: self.height,
            ground_y: Some(self.ground_y),
        }
    }

    /// y coordinate that puts a box of `height` standing on the ground
    pub fn standing_y(&self, height: f32) -> f32 {
        self.ground_y - height * 0.5
    }
}

/// Door on the exploration map leading into a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub level_id: LevelId,
    pub region: Rect,
}

impl Door {
    /// Where the player reappears after leaving this door's level
    pub fn return_point(&self) -> Vec2 {
        let center = self.region.center();
        Vec2::new(
            center.x,
            self.region.max().y + exploration::DOOR_RETURN_OFFSET,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationMap {
    pub width: f32,
    pub height: f32,
    pub spawn: Vec2,
    pub doors: Vec<Door>,
}

impl ExplorationMap {
    /// First door whose region contains `position`
    pub fn door_at(&self, position: Vec2) -> Option<&Door> {
        self.doors.iter().find(|d| d.region.contains(position))
    }

    pub fn door_for(&self, level_id: LevelId) -> Option<&Door> {
        self.doors.iter().find(|d| d.level_id == level_id)
    }
}

/// Identities that must never be remediated. Entities spawned for these
/// start protected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionList {
    ids: HashSet<String>,
}

impl ExemptionList {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, target_id: &str) -> bool {
        self.ids.contains(target_id)
    }

    pub fn insert(&mut self, target_id: impl Into<String>) -> bool {
        self.ids.insert(target_id.into())
    }

    pub fn remove(&mut self, target_id: &str) -> bool {
        self.ids.remove(target_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelCatalog {
    levels: HashMap<LevelId, LevelTemplate>,
    order: Vec<LevelId>,
    pub map: ExplorationMap,
}

impl LevelCatalog {
    /// Assemble a catalogue from explicit data. Level order follows `levels`.
    pub fn from_parts(levels: Vec<LevelTemplate>, map: ExplorationMap) -> Self {
        let order = levels.iter().map(|l| l.id).collect();
        let levels = levels.into_iter().map(|l| (l.id, l)).collect();
        Self { levels, order, map }
    }

    /// Deterministic catalogue of `count` levels, ids starting at 1
    pub fn generate(seed: u64, count: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let levels: Vec<LevelTemplate> = (1..=count).map(|id| generate_level(&mut rng, id)).collect();

        let doors = levels
            .iter()
            .enumerate()
            .map(|(i, l)| Door {
                level_id: l.id,
                region: Rect::new(
                    200.0 + i as f32 * 350.0,
                    200.0,
                    exploration::DOOR_SIZE,
                    exploration::DOOR_SIZE,
                ),
            })
            .collect();

        let map = ExplorationMap {
            width: exploration::MAP_WIDTH,
            height: exploration::MAP_HEIGHT,
            spawn: Vec2::new(exploration::MAP_WIDTH * 0.5, exploration::MAP_HEIGHT * 0.75),
            doors,
        };

        tracing::debug!("Generated {} levels from seed {}", count, seed);
        Self::from_parts(levels, map)
    }

    pub fn level(&self, id: LevelId) -> Option<&LevelTemplate> {
        self.levels.get(&id)
    }

    pub fn first(&self) -> Option<LevelId> {
        self.order.first().copied()
    }

    /// Level unlocked by clearing `id`
    pub fn next_after(&self, id: LevelId) -> Option<LevelId> {
        let idx = self.order.iter().position(|&l| l == id)?;
        self.order.get(idx + 1).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn generate_level(rng: &mut StdRng, id: LevelId) -> LevelTemplate {
    let width = level::WIDTH;
    let height = level::GROUND_Y + 200.0;
    let ground_y = level::GROUND_Y;
    let scope = format!("account-{id}");

    let stand = |h: f32| ground_y - h * 0.5;
    let spawn_min = level::ENTRY_X + level::SPAWN_CLEARANCE;
    let spawn_max = width - 200.0;

    let mut spawns = Vec::new();
    for n in 0..(6 + 2 * id) {
        spawns.push(SpawnSpec {
            kind: EntityKind::Hostile,
            identity: Identity::new(format!("zombie-{id}-{n}"), scope.clone()),
            position: Vec2::new(rng.gen_range(spawn_min..spawn_max), stand(hostile::HEIGHT)),
        });
    }
    for n in 0..id {
        spawns.push(SpawnSpec {
            kind: EntityKind::ThirdParty,
            identity: Identity::new(format!("access-{id}-{n}"), scope.clone()),
            position: Vec2::new(rng.gen_range(spawn_min..spawn_max), stand(third_party::HEIGHT)),
        });
    }

    let trigger_x = width * 0.375;
    let behavior = if id % 2 == 1 {
        AdversaryBehavior::Racer
    } else {
        AdversaryBehavior::Patrol {
            waypoints: vec![
                Vec2::new(trigger_x + 300.0, stand(hostile::HEIGHT)),
                Vec2::new(trigger_x + 100.0, stand(hostile::HEIGHT)),
            ],
        }
    };
    let quest = QuestDefinition {
        id: format!("quest-{id}"),
        name: if id % 2 == 1 { "Outrun the Hacker" } else { "Beat the Auditor" }.to_string(),
        trigger_x,
        objective: Vec2::new(width - 400.0, stand(player::HEIGHT)),
        adversary_spawn: Vec2::new(trigger_x - 200.0, stand(hostile::HEIGHT)),
        adversary_speed: quest::ADVERSARY_SPEED,
        behavior,
        protect_resource_id: format!("crown-jewel-{id}"),
    };

    let pattern = if id % 2 == 1 {
        AttackPattern::Charger
    } else {
        AttackPattern::Sentinel
    };

    LevelTemplate {
        id,
        name: format!("Level {id}"),
        width,
        height,
        ground_y,
        entry: Vec2::new(level::ENTRY_X, stand(player::HEIGHT)),
        exit: Rect::new(width - level::EXIT_WIDTH, 0.0, level::EXIT_WIDTH, height),
        spawns,
        quest: Some(quest),
        boss: BossSpec {
            pattern,
            position: Vec2::new(width * 0.5, stand(boss::HEIGHT)),
        },
    }
}
