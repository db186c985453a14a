//! End-to-end runs of the state machine against the simulated world.

use std::collections::BTreeMap;
use std::sync::Arc;

use agent_core::{
    AgentConfig, AgentError, AgentState, AgentStateMachine, CapabilityConfig, CapabilityVia,
    CombatConfig, ConfigError, ContainerScope, DepositConfig, EntityId, EntityTags, HealMethod,
    HookConfig, InventoryConfig, InventoryTrigger, KindTag, MaterialNeed, OutcomePatterns,
    Position, RecoveryTrigger, RestockConfig, SelectorConfig, SuccessPolicy, TimingConfig,
    ToolConfig, TrackedStock, TrainingPlan, TrainingTier, WorldView,
};
use agent_sim::{AgentSpec, Behavior, EntitySpec, ItemSpec, Scenario, SimWorld};

const TREE: KindTag = KindTag(0x0CD0);
const LOG: KindTag = KindTag(0x1BDD);
const AXE: KindTag = KindTag(0x0F43);
const BANDAGE: KindTag = KindTag(0x0E21);
const BOARD: KindTag = KindTag(0x1BD7);
const BENCH: KindTag = KindTag(0x1DC0);
const SAW: KindTag = KindTag(0x1034);
const ORE: KindTag = KindTag(0x19B9);

const CHEST: EntityId = EntityId(0x2001);
const CRATE: EntityId = EntityId(0x2002);

// ============================================================================
// Fixtures
// ============================================================================

fn lumberjack() -> AgentConfig {
    AgentConfig {
        name: "test lumberjack".into(),
        selector: SelectorConfig {
            kinds: vec![TREE],
            required_tags: EntityTags::RESOURCE,
            ..Default::default()
        },
        capability: CapabilityConfig {
            name: "chop".into(),
            via: CapabilityVia::EquippedTool,
            prompted: true,
        },
        patterns: OutcomePatterns {
            success: vec!["You put some logs".into()],
            failure: vec!["You hack at the tree".into()],
            terminal: vec!["not enough wood".into()],
        },
        timing: TimingConfig {
            prompt_timeout_ms: 1_000,
            outcome_window_ms: 3_000,
            poll_interval_ms: 250,
            ..Default::default()
        },
        tool: Some(ToolConfig {
            name: "axe".into(),
            kinds: vec![AXE],
        }),
        ..Default::default()
    }
}

fn harvest(per_use: u32, remaining: u32) -> Behavior {
    Behavior::Harvest {
        yield_kind: LOG,
        per_use,
        remaining,
        success_text: "You put some logs into your backpack.".into(),
        depleted_text: "There's not enough wood here to harvest.".into(),
        fail_every: None,
        fail_text: String::new(),
    }
}

fn entity(id: u32, kind: KindTag, x: i32, y: i32, tags: EntityTags, behavior: Behavior) -> EntitySpec {
    EntitySpec {
        id: EntityId(id),
        kind,
        name: String::new(),
        position: Position::new(x, y, 0),
        health: (100, 100),
        tags,
        behavior,
    }
}

fn tree(id: u32, x: i32, y: i32, behavior: Behavior) -> EntitySpec {
    entity(id, TREE, x, y, EntityTags::RESOURCE, behavior)
}

fn chest(id: EntityId, x: i32, y: i32) -> EntitySpec {
    entity(
        id.0,
        KindTag(0x0E43),
        x,
        y,
        EntityTags::empty(),
        Behavior::Container {
            open_text: String::new(),
        },
    )
}

fn item(id: u32, kind: KindTag, amount: u32, container: ContainerScope, uses: Option<u32>) -> ItemSpec {
    ItemSpec {
        id: EntityId(id),
        kind,
        amount,
        container,
        uses,
    }
}

fn world(agent: AgentSpec, entities: Vec<EntitySpec>, items: Vec<ItemSpec>) -> SimWorld {
    SimWorld::new(Scenario {
        agent,
        entities,
        items,
        ..Default::default()
    })
    .unwrap()
}

async fn start(config: AgentConfig, world: &SimWorld) -> AgentStateMachine {
    AgentStateMachine::start(config, Arc::new(world.clone()))
        .await
        .unwrap()
}

async fn tick_until(
    machine: &mut AgentStateMachine,
    limit: u32,
    done: impl Fn(&AgentStateMachine) -> bool,
) {
    for _ in 0..limit {
        if done(machine) {
            return;
        }
        machine.tick().await;
    }
    assert!(done(machine), "condition not reached in {limit} ticks");
}

// ============================================================================
// Attempts and exhaustion
// ============================================================================

#[tokio::test(start_paused = true)]
async fn silent_target_is_exhausted_on_the_fourth_failure() {
    let world = world(
        AgentSpec::default(),
        vec![tree(0x1001, 1, 0, Behavior::Inert)],
        vec![item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None)],
    );
    let mut machine = start(lumberjack(), &world).await;

    tick_until(&mut machine, 100, |m| m.memory().contains(EntityId(0x1001))).await;

    let stats = machine.stats();
    assert_eq!(stats.attempts, 4);
    assert_eq!(stats.outcome_timeouts, 4);
    assert_eq!(stats.failures, 4);
    assert_eq!(machine.attempts_for(EntityId(0x1001)), 0);
    assert_eq!(machine.state(), &AgentState::Idle);
}

#[tokio::test(start_paused = true)]
async fn missing_prompt_exhausts_without_counting_an_attempt() {
    let world = world(
        AgentSpec::default(),
        vec![tree(0x1001, 1, 0, harvest(1, 5))],
        vec![item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None)],
    );
    world.set_responsive(false);
    let mut machine = start(lumberjack(), &world).await;

    tick_until(&mut machine, 20, |m| m.memory().contains(EntityId(0x1001))).await;

    assert_eq!(machine.stats().attempts, 0);
    assert_eq!(machine.stats().prompt_timeouts, 1);
    assert_eq!(machine.attempts_for(EntityId(0x1001)), 0);
    assert_eq!(world.count(LOG, ContainerScope::Backpack), 0);
}

#[tokio::test(start_paused = true)]
async fn unreachable_target_is_remembered_and_agent_stays_put() {
    let world = world(
        AgentSpec::default(),
        vec![tree(0x1001, 6, 0, harvest(1, 5))],
        vec![item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None)],
    );
    world.block(Position::new(6, 0, 0));
    let mut machine = start(lumberjack(), &world).await;

    tick_until(&mut machine, 20, |m| m.memory().contains(EntityId(0x1001))).await;

    assert_eq!(machine.stats().travel_failures, 1);
    assert_eq!(machine.stats().attempts, 0);
    assert_eq!(world.position(), Position::ORIGIN);
    assert_eq!(machine.state(), &AgentState::Idle);
}

#[tokio::test(start_paused = true)]
async fn oldest_memory_entry_is_evicted_and_selectable_again() {
    let trees = (0x1001..=0x1033)
        .map(|id| tree(id, 1, 0, harvest(1, 0)))
        .collect();
    let world = world(
        AgentSpec::default(),
        trees,
        vec![item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None)],
    );
    let mut machine = start(lumberjack(), &world).await;

    tick_until(&mut machine, 1_000, |m| m.stats().exhausted == 51).await;

    assert_eq!(machine.stats().terminal_failures, 51);
    assert_eq!(machine.memory().len(), 50);
    assert!(!machine.memory().contains(EntityId(0x1001)));
    assert!(machine.memory().contains(EntityId(0x1033)));

    tick_until(&mut machine, 5, |m| {
        matches!(m.state(), AgentState::Acquiring { .. })
    })
    .await;
    assert_eq!(machine.state().target().map(|t| t.id), Some(EntityId(0x1001)));
}

// ============================================================================
// Interrupts
// ============================================================================

fn with_deposit(mut config: AgentConfig, finish: bool) -> AgentConfig {
    config.inventory = InventoryConfig {
        tracked: vec![TrackedStock {
            kind: LOG,
            ceiling: 10,
        }],
        deposit: Some(DepositConfig {
            site: Position::new(12, 12, 0),
            container: CHEST,
            kinds: vec![LOG],
            finish_with_deposit: finish,
        }),
        ..Default::default()
    };
    config
}

#[tokio::test(start_paused = true)]
async fn stock_over_ceiling_is_deposited_and_agent_returns() {
    let world = world(
        AgentSpec::default(),
        vec![tree(0x1001, 1, 0, harvest(11, 1)), chest(CHEST, 12, 12)],
        vec![item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None)],
    );
    let mut machine = start(with_deposit(lumberjack(), false), &world).await;

    tick_until(&mut machine, 30, |m| m.stats().deposits == 1).await;

    assert_eq!(world.count(LOG, ContainerScope::Backpack), 0);
    assert_eq!(world.count(LOG, ContainerScope::Container(CHEST)), 11);
    assert_eq!(world.position(), Position::ORIGIN);
    assert_eq!(machine.state(), &AgentState::Idle);
}

#[tokio::test(start_paused = true)]
async fn load_the_drop_off_does_not_take_ends_the_run() {
    let world = SimWorld::new(Scenario {
        entities: vec![tree(0x1001, 1, 0, harvest(1, 5)), chest(CHEST, 12, 12)],
        items: vec![
            item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None),
            item(0x4000_0002, ORE, 40, ContainerScope::Backpack, None),
        ],
        weights: BTreeMap::from([(ORE, 10)]),
        ..Default::default()
    })
    .unwrap();
    let mut machine = start(with_deposit(lumberjack(), false), &world).await;

    let report = machine.run(Some(200)).await;

    assert_eq!(report.termination().map(|r| r.label()), Some("overweight"));
    assert_eq!(report.stats.ticks, 2);
    assert_eq!(report.stats.deposits, 0);
    assert_eq!(world.count(ORE, ContainerScope::Backpack), 40);
}

#[tokio::test(start_paused = true)]
async fn start_rejects_tracked_kind_the_drop_off_never_takes() {
    let world = world(AgentSpec::default(), vec![], vec![]);
    let mut config = with_deposit(lumberjack(), false);
    config.inventory.tracked.push(TrackedStock {
        kind: ORE,
        ceiling: 5,
    });

    let Err(error) = AgentStateMachine::start(config, Arc::new(world)).await else {
        panic!("start should reject a tracked kind with no way out of the pack");
    };
    assert_eq!(
        error,
        AgentError::ConfigurationInvalid(ConfigError::UnloadedStock(ORE))
    );
}

#[tokio::test(start_paused = true)]
async fn health_loss_is_handled_before_a_full_pack() {
    let mut config = with_deposit(lumberjack(), false);
    config.combat.self_defense = true;
    let world = world(
        AgentSpec::default(),
        vec![chest(CHEST, 12, 12)],
        vec![
            item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None),
            item(0x4000_0002, LOG, 20, ContainerScope::Backpack, None),
        ],
    );
    let mut machine = start(config, &world).await;
    world.damage_agent(10);

    machine.tick().await;
    assert_eq!(
        machine.state(),
        &AgentState::Recovering {
            trigger: RecoveryTrigger::UnderAttack { lost: 10 }
        }
    );

    machine.tick().await;
    assert_eq!(machine.state(), &AgentState::Idle);
    assert_eq!(machine.stats().recoveries, 1);

    machine.tick().await;
    assert_eq!(
        machine.state(),
        &AgentState::Depositing {
            trigger: InventoryTrigger::StockCeiling {
                kind: LOG,
                count: 20,
                ceiling: 10
            }
        }
    );
}

#[tokio::test(start_paused = true)]
async fn attacker_is_fought_off_and_bandages_restore_health() {
    let mut config = lumberjack();
    config.combat = CombatConfig {
        self_defense: true,
        heal: HealMethod::Bandage {
            kind: BANDAGE,
            cooldown_ms: 5_000,
        },
        ..Default::default()
    };
    let world = world(
        AgentSpec::default(),
        vec![EntitySpec {
            health: (50, 50),
            ..entity(0x7010, KindTag(0x0033), 1, 1, EntityTags::HOSTILE, Behavior::Inert)
        }],
        vec![
            item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None),
            item(0x4000_0002, BANDAGE, 10, ContainerScope::Backpack, None),
        ],
    );
    world.mark_attacking(EntityId(0x7010));
    let mut machine = start(config, &world).await;
    world.damage_agent(30);

    machine.tick().await;
    assert!(matches!(machine.state(), AgentState::Recovering { .. }));
    machine.tick().await;

    assert_eq!(machine.state(), &AgentState::Idle);
    assert!(world.entity(EntityId(0x7010)).is_none());
    assert_eq!(world.health().current, 100);
    assert_eq!(world.count(BANDAGE, ContainerScope::Backpack), 8);
    assert_eq!(machine.stats().recoveries, 1);

    machine.tick().await;
    assert!(!matches!(machine.state(), AgentState::Recovering { .. }));
}

#[tokio::test(start_paused = true)]
async fn broken_tool_is_replaced_from_the_backpack() {
    let world = world(
        AgentSpec::default(),
        vec![tree(0x1001, 1, 0, harvest(1, 5))],
        vec![
            item(0x4000_0001, AXE, 1, ContainerScope::Equipped, Some(1)),
            item(0x4000_0002, AXE, 1, ContainerScope::Backpack, None),
        ],
    );
    let mut machine = start(lumberjack(), &world).await;

    tick_until(&mut machine, 30, |m| m.stats().tool_replacements == 1).await;

    assert_eq!(world.count(AXE, ContainerScope::Equipped), 1);
    assert_eq!(world.count(AXE, ContainerScope::Backpack), 0);
    assert!(!machine.is_terminated());
}

#[tokio::test(start_paused = true)]
async fn last_tool_breaking_ends_the_run_after_a_final_deposit() {
    let world = world(
        AgentSpec::default(),
        vec![tree(0x1001, 1, 0, harvest(1, 5)), chest(CHEST, 12, 12)],
        vec![item(0x4000_0001, AXE, 1, ContainerScope::Equipped, Some(1))],
    );
    let mut machine = start(with_deposit(lumberjack(), true), &world).await;

    let report = machine.run(Some(100)).await;

    let reason = report.termination().unwrap();
    assert_eq!(reason.label(), "tool_exhausted");
    assert_eq!(world.count(LOG, ContainerScope::Container(CHEST)), 1);
    assert_eq!(report.stats.deposits, 1);
}

#[tokio::test(start_paused = true)]
async fn idle_limit_ends_the_run_when_nothing_is_left() {
    let mut config = lumberjack();
    config.thresholds.idle_limit = Some(3);
    let world = world(
        AgentSpec::default(),
        Vec::new(),
        vec![item(0x4000_0001, AXE, 1, ContainerScope::Equipped, None)],
    );
    let mut machine = start(config, &world).await;

    let report = machine.run(Some(10)).await;

    assert_eq!(report.termination().map(|r| r.label()), Some("no_targets"));
    assert_eq!(report.stats.ticks, 3);
}

// ============================================================================
// Hooks
// ============================================================================

#[tokio::test(start_paused = true)]
async fn tamed_creature_is_renamed_then_released() {
    let config = AgentConfig {
        name: "test tamer".into(),
        selector: SelectorConfig {
            required_tags: EntityTags::TAMEABLE,
            ..Default::default()
        },
        capability: CapabilityConfig {
            name: "Animal Taming".into(),
            via: CapabilityVia::Skill,
            prompted: true,
        },
        patterns: OutcomePatterns {
            success: vec!["accept you as master".into()],
            failure: vec!["You fail to tame".into()],
            terminal: vec!["already tame".into()],
        },
        hooks: vec![
            HookConfig::Release { keep_followers: 1 },
            HookConfig::Rename {
                name: "Rex".into(),
            },
        ],
        ..Default::default()
    };
    let world = world(
        AgentSpec::default(),
        vec![entity(
            0x3001,
            KindTag(0x00D9),
            1,
            0,
            EntityTags::TAMEABLE,
            Behavior::Tame {
                resist: 1,
                success_text: "It seems to accept you as master.".into(),
                failure_text: "You fail to tame the creature.".into(),
                tamed_text: "That creature is already tame.".into(),
            },
        )],
        Vec::new(),
    );
    let mut machine = start(config, &world).await;

    tick_until(&mut machine, 30, |m| m.stats().successes == 1).await;

    assert_eq!(machine.stats().failures, 1);
    assert_eq!(world.entity(EntityId(0x3001)).unwrap().name, "Rex");
    assert_eq!(world.snapshot_self().await.resources.followers.current, 0);
    assert!(machine.memory().contains(EntityId(0x3001)));
}

// ============================================================================
// Training plans and restocking
// ============================================================================

fn carpenter(proficiency_floor: f32) -> AgentConfig {
    AgentConfig {
        name: "test carpenter".into(),
        selector: SelectorConfig {
            kinds: vec![BENCH],
            required_tags: EntityTags::STATION,
            ..Default::default()
        },
        capability: CapabilityConfig {
            name: "barrel staves".into(),
            via: CapabilityVia::EquippedTool,
            prompted: true,
        },
        patterns: OutcomePatterns {
            success: vec!["You create".into()],
            failure: vec!["You fail to create".into()],
            terminal: vec!["sufficient wood".into()],
        },
        success_policy: SuccessPolicy::Repeat,
        tool: Some(ToolConfig {
            name: "saw".into(),
            kinds: vec![SAW],
        }),
        plan: Some(TrainingPlan {
            tiers: vec![TrainingTier {
                name: "staves".into(),
                min: proficiency_floor,
                max: 50.0,
                capability: "barrel staves".into(),
                material: Some(MaterialNeed {
                    kind: BOARD,
                    amount: 40,
                }),
            }],
            cap: 50.0,
            recycle: None,
        }),
        ..Default::default()
    }
}

fn workshop(proficiency: f32, boards_in_crate: u32) -> SimWorld {
    workshop_with(
        AgentSpec {
            proficiency,
            gain: 5.0,
            ..Default::default()
        },
        boards_in_crate,
    )
}

fn workshop_with(agent: AgentSpec, boards_in_crate: u32) -> SimWorld {
    let mut items = vec![
        item(0x4000_0001, SAW, 1, ContainerScope::Equipped, None),
        item(0x4000_0002, BOARD, 30, ContainerScope::Backpack, None),
    ];
    if boards_in_crate > 0 {
        items.push(item(
            0x4000_0003,
            BOARD,
            boards_in_crate,
            ContainerScope::Container(CRATE),
            None,
        ));
    }
    world(
        agent,
        vec![
            entity(
                0x6001,
                BENCH,
                1,
                0,
                EntityTags::STATION,
                Behavior::Station {
                    material: BOARD,
                    cost: 3,
                    product: KindTag(0x1EB2),
                    success_text: "You create the item and put it in your backpack.".into(),
                    shortage_text: "You do not have sufficient wood to make that.".into(),
                },
            ),
            chest(CRATE, 0, 1),
        ],
        items,
    )
}

#[tokio::test(start_paused = true)]
async fn reaching_the_plan_cap_ends_the_run() {
    let world = workshop(45.0, 0);
    let mut machine = start(carpenter(30.0), &world).await;

    let report = machine.run(Some(50)).await;

    assert_eq!(report.termination().map(|r| r.label()), Some("plan_complete"));
    assert_eq!(report.stats.successes, 1);
    assert_eq!(world.count(BOARD, ContainerScope::Backpack), 27);
}

#[tokio::test(start_paused = true)]
async fn start_rejects_proficiency_outside_every_tier() {
    let world = workshop(10.0, 0);
    let Err(error) = AgentStateMachine::start(carpenter(30.0), Arc::new(world)).await else {
        panic!("start should fail below the first tier");
    };
    assert_eq!(
        error,
        AgentError::ConfigurationInvalid(ConfigError::NoTierForProficiency { proficiency: 10.0 })
    );
}

fn with_restock(mut config: AgentConfig) -> AgentConfig {
    config.inventory.restock = Some(RestockConfig {
        kind: BOARD,
        supply: CRATE,
        site: None,
        floor: 10,
        weight_buffer: 50,
    });
    config
}

#[tokio::test(start_paused = true)]
async fn low_material_is_restocked_from_the_supply() {
    let world = workshop(40.0, 25);
    let mut machine = start(with_restock(carpenter(30.0)), &world).await;

    machine.tick().await;
    assert!(matches!(
        machine.state(),
        AgentState::Depositing {
            trigger: InventoryTrigger::StockFloor { .. }
        }
    ));
    machine.tick().await;

    assert_eq!(machine.stats().restocks, 1);
    assert_eq!(world.count(BOARD, ContainerScope::Backpack), 55);
    assert_eq!(world.count(BOARD, ContainerScope::Container(CRATE)), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_supply_ends_the_run() {
    let world = workshop(40.0, 0);
    let mut machine = start(with_restock(carpenter(30.0)), &world).await;

    let report = machine.run(Some(5)).await;

    assert_eq!(
        report.termination().map(|r| r.label()),
        Some("supply_exhausted")
    );
}

#[tokio::test(start_paused = true)]
async fn restock_with_no_free_weight_ends_the_run() {
    let world = workshop_with(
        AgentSpec {
            proficiency: 40.0,
            max_weight: 60,
            ..Default::default()
        },
        25,
    );
    let mut machine = start(with_restock(carpenter(30.0)), &world).await;

    let report = machine.run(Some(5)).await;

    assert_eq!(report.termination().map(|r| r.label()), Some("overweight"));
    assert_eq!(report.stats.restocks, 0);
    assert_eq!(world.count(BOARD, ContainerScope::Container(CRATE)), 25);
}
