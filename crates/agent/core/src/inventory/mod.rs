//! Inventory sub-tasks: restock, conversion, deposit and disposal.
//!
//! The coordinator runs one sub-task chain per [`InventoryTrigger`] and reports
//! what it changed. Conditions with no safe continuation (unreachable drop-off,
//! empty supply, nowhere to unload) come back as a [`TerminationReason`].

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{
    AgentConfig, ConversionConfig, ConversionVia, DepositConfig, DisposeTo, InventoryConfig,
    OverflowPolicy, RestockConfig,
};
use crate::env::{Actor, Host, TargetRef, find_any};
use crate::error::{AgentError, TerminationReason};
use crate::interrupt::InventoryTrigger;
use crate::plan::Recycle;
use crate::state::{ContainerScope, KindTag};

/// What a coordinator run changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InventoryOutcome {
    Deposited { moved: u32 },
    Converted { batches: u32 },
    Restocked { amount: u32 },
    Disposed { moved: u32 },
    Unchanged,
}

/// Runs inventory sub-tasks when a stock threshold is crossed.
#[derive(Clone, Debug)]
pub struct InventoryCoordinator {
    config: InventoryConfig,
    tool_kinds: Vec<KindTag>,
    weight_margin: u32,
    travel_timeout: Duration,
    prompt_timeout: Duration,
    material_floor: Option<u32>,
}

impl InventoryCoordinator {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            config: config.inventory.clone(),
            tool_kinds: config.tool.as_ref().map(|t| t.kinds.clone()).unwrap_or_default(),
            weight_margin: config.inventory.weight_margin,
            travel_timeout: config.timing.travel_timeout(),
            prompt_timeout: config.timing.prompt_timeout(),
            material_floor: None,
        }
    }

    /// Overrides the restock floor for the current training tier.
    pub fn set_material_floor(&mut self, floor: Option<u32>) {
        self.material_floor = floor;
    }

    pub fn finishes_with_deposit(&self) -> bool {
        self.config
            .deposit
            .as_ref()
            .is_some_and(|d| d.finish_with_deposit)
    }

    /// Handles `trigger` and reports the outcome.
    ///
    /// # Returns
    ///
    /// - `Ok(outcome)` when the agent can carry on
    /// - `Err(reason)` when the run has to end
    pub async fn check_and_run<H: Host + ?Sized>(
        &self,
        host: &H,
        trigger: InventoryTrigger,
    ) -> Result<InventoryOutcome, TerminationReason> {
        debug!(target: "agent::inventory", ?trigger, "inventory sub-task triggered");

        if let InventoryTrigger::StockFloor { .. } = trigger {
            return self.restock(host).await;
        }

        let mut converted = 0;
        if let Some(conversion) = &self.config.conversion {
            converted = self.convert(host, conversion).await;
            if converted > 0 && !self.still_over(host).await {
                return Ok(InventoryOutcome::Converted { batches: converted });
            }
        }

        let outcome = match (&self.config.overflow, &self.config.deposit) {
            (OverflowPolicy::Deposit, Some(deposit)) => {
                let moved = self.deposit(host, deposit).await?;
                InventoryOutcome::Deposited { moved }
            }
            (OverflowPolicy::Dispose { kinds, destination }, _) => {
                let moved = self.dispose(host, kinds, *destination).await;
                InventoryOutcome::Disposed { moved }
            }
            _ if converted > 0 => InventoryOutcome::Converted { batches: converted },
            _ => return Err(overweight(host).await),
        };

        // The trigger has to be clear once the unload is done.
        if self.still_over(host).await {
            warn!(target: "agent::inventory", ?outcome, "pack still over its limits after unloading");
            return Err(overweight(host).await);
        }
        Ok(outcome)
    }

    /// Last unload before the run ends, when the profile asks for one.
    pub async fn final_deposit<H: Host + ?Sized>(&self, host: &H) -> Result<u32, TerminationReason> {
        match &self.config.deposit {
            Some(deposit) if deposit.finish_with_deposit => self.deposit(host, deposit).await,
            _ => Ok(0),
        }
    }

    async fn still_over<H: Host + ?Sized>(&self, host: &H) -> bool {
        let status = host.snapshot_self().await;
        if status.weight.maximum > 0
            && status.weight.current + self.weight_margin >= status.weight.maximum
        {
            return true;
        }
        for tracked in &self.config.tracked {
            if host.inventory_count(tracked.kind, ContainerScope::Backpack).await > tracked.ceiling {
                return true;
            }
        }
        false
    }

    /// Melts crafted output back into material, one kind at a time.
    pub async fn recycle<H: Host + ?Sized>(&self, host: &H, recycle: &Recycle) -> u32 {
        let mut batches = 0;
        for kind in &recycle.kinds {
            batches += self.process(host, *kind, &recycle.via, recycle.batch_limit).await;
        }
        if batches > 0 {
            info!(target: "agent::inventory", batches, "recycled crafted items");
        }
        batches
    }

    async fn convert<H: Host + ?Sized>(&self, host: &H, conversion: &ConversionConfig) -> u32 {
        let batches = self
            .process(host, conversion.raw, &conversion.via, conversion.batch_limit)
            .await;
        if batches > 0 {
            info!(
                target: "agent::inventory",
                batches,
                refined = %conversion.refined,
                "converted raw material"
            );
        }
        batches
    }

    /// Processes `raw` stacks one at a time until none remain, the tool is gone
    /// or a batch makes no progress.
    async fn process<H: Host + ?Sized>(
        &self,
        host: &H,
        raw: KindTag,
        via: &ConversionVia,
        batch_limit: u32,
    ) -> u32 {
        let mut batches = 0;
        while batches < batch_limit {
            let Some(stack) = host.inventory_find(raw, ContainerScope::Backpack).await else {
                break;
            };
            let before = host.inventory_count(raw, ContainerScope::Backpack).await;

            let (actor, target) = match via {
                ConversionVia::ToolOnRaw => {
                    let Some(tool) = find_any(host, &self.tool_kinds, ContainerScope::Equipped).await
                    else {
                        debug!(target: "agent::inventory", %raw, "processing stopped: tool missing");
                        break;
                    };
                    (Actor::Item(tool), TargetRef::Object(stack.id))
                }
                ConversionVia::RawOnStation(station) => {
                    (Actor::Item(stack), TargetRef::Object(*station))
                }
            };

            let Some(handle) = host.use_capability(&actor, None).await else {
                break;
            };
            if !host.wait_for_prompt(handle, self.prompt_timeout).await {
                break;
            }
            host.resolve_prompt(handle, &target).await;

            let after = host.inventory_count(raw, ContainerScope::Backpack).await;
            if after >= before {
                warn!(target: "agent::inventory", %raw, "processing made no progress");
                break;
            }
            batches += 1;
        }
        batches
    }

    /// Moves every stack of `kind` from the backpack into `destination`.
    async fn move_all<H: Host + ?Sized>(&self, host: &H, kind: KindTag, destination: ContainerScope) -> u32 {
        let mut moved = 0;
        while let Some(item) = host.inventory_find(kind, ContainerScope::Backpack).await {
            if !host.move_item(&item, destination, 0).await {
                warn!(target: "agent::inventory", %kind, %destination, "item transfer refused");
                break;
            }
            moved += item.amount;
        }
        moved
    }

    /// Travels to the drop-off, unloads every deposit kind, then heads back.
    async fn deposit<H: Host + ?Sized>(
        &self,
        host: &H,
        deposit: &DepositConfig,
    ) -> Result<u32, TerminationReason> {
        let origin = host.snapshot_self().await.position;

        if !host.travel_to(deposit.site, self.travel_timeout).await {
            return Err(AgentError::DepositUnreachable { site: deposit.site }.into());
        }

        let mut moved = 0;
        for kind in &deposit.kinds {
            moved += self
                .move_all(host, *kind, ContainerScope::Container(deposit.container))
                .await;
        }

        info!(
            target: "agent::inventory",
            moved,
            site = %deposit.site,
            "deposited at drop-off"
        );

        if !host.travel_to(origin, self.travel_timeout).await {
            warn!(
                target: "agent::inventory",
                %origin,
                "could not return from drop-off, continuing from here"
            );
        }
        Ok(moved)
    }

    async fn dispose<H: Host + ?Sized>(&self, host: &H, kinds: &[KindTag], destination: DisposeTo) -> u32 {
        let scope = match destination {
            DisposeTo::Ground => ContainerScope::Ground,
            DisposeTo::Container(id) => ContainerScope::Container(id),
        };
        let mut moved = 0;
        for kind in kinds {
            moved += self.move_all(host, *kind, scope).await;
        }
        info!(target: "agent::inventory", moved, %scope, "disposed of items");
        moved
    }

    /// Pulls material from the supply container, bounded by free weight.
    async fn restock<H: Host + ?Sized>(&self, host: &H) -> Result<InventoryOutcome, TerminationReason> {
        let Some(restock) = &self.config.restock else {
            return Ok(InventoryOutcome::Unchanged);
        };
        let RestockConfig {
            kind,
            supply,
            site,
            floor,
            weight_buffer,
        } = restock;
        let floor = self.material_floor.unwrap_or(*floor);

        if let Some(site) = site
            && !host.travel_to(*site, self.travel_timeout).await
        {
            return Err(AgentError::DepositUnreachable { site: *site }.into());
        }

        let Some(stack) = host.inventory_find(*kind, ContainerScope::Container(*supply)).await else {
            return Err(AgentError::SupplyExhausted { kind: *kind }.into());
        };

        let status = host.snapshot_self().await;
        let free = status
            .weight
            .maximum
            .saturating_sub(status.weight.current)
            .saturating_sub(*weight_buffer);
        let amount = free.min(stack.amount);
        if amount == 0 {
            warn!(target: "agent::inventory", %kind, floor, "no room to restock");
            return Err(TerminationReason::Overweight {
                weight: status.weight.current,
                maximum: status.weight.maximum,
            });
        }

        if !host.move_item(&stack, ContainerScope::Backpack, amount).await {
            warn!(target: "agent::inventory", %kind, amount, "restock transfer refused");
            return Err(AgentError::SupplyExhausted { kind: *kind }.into());
        }

        info!(target: "agent::inventory", %kind, amount, "restocked material");
        Ok(InventoryOutcome::Restocked { amount })
    }
}

async fn overweight<H: Host + ?Sized>(host: &H) -> TerminationReason {
    let status = host.snapshot_self().await;
    TerminationReason::Overweight {
        weight: status.weight.current,
        maximum: status.weight.maximum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ToolConfig, TrackedStock};
    use crate::mock::MockHost;
    use crate::state::{EntityId, Position};

    const LOG: KindTag = KindTag(0x1BDD);
    const ORE: KindTag = KindTag(0x19B9);
    const BOARD: KindTag = KindTag(0x1BD7);
    const SAW: KindTag = KindTag(0x1034);
    const CHEST: EntityId = EntityId(0x2001);
    const CRATE: EntityId = EntityId(0x2002);
    const SITE: Position = Position::new(12, 12, 0);

    fn coordinator(inventory: InventoryConfig) -> InventoryCoordinator {
        InventoryCoordinator::from_config(&AgentConfig {
            tool: Some(ToolConfig {
                name: "saw".into(),
                kinds: vec![SAW],
            }),
            inventory,
            ..AgentConfig::default()
        })
    }

    fn log_deposit() -> Option<DepositConfig> {
        Some(DepositConfig {
            site: SITE,
            container: CHEST,
            kinds: vec![LOG],
            finish_with_deposit: false,
        })
    }

    fn board_restock() -> Option<RestockConfig> {
        Some(RestockConfig {
            kind: BOARD,
            supply: CRATE,
            site: None,
            floor: 10,
            weight_buffer: 50,
        })
    }

    const HEAVY: InventoryTrigger = InventoryTrigger::Overweight {
        weight: 400,
        maximum: 400,
    };

    #[tokio::test(start_paused = true)]
    async fn overweight_without_drop_off_stops() {
        let host = MockHost::new().with_item(1, LOG, 390, ContainerScope::Backpack);
        let coordinator = coordinator(InventoryConfig::default());

        let result = coordinator.check_and_run(&host, HEAVY).await;

        assert_eq!(
            result,
            Err(TerminationReason::Overweight {
                weight: 390,
                maximum: 400
            })
        );
        assert!(host.travels().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn conversion_that_clears_the_trigger_skips_the_deposit() {
        let host = MockHost::new()
            .with_item(1, SAW, 1, ContainerScope::Equipped)
            .with_item(2, LOG, 30, ContainerScope::Backpack)
            .with_refine(LOG, BOARD);
        let coordinator = coordinator(InventoryConfig {
            tracked: vec![TrackedStock {
                kind: LOG,
                ceiling: 20,
            }],
            conversion: Some(ConversionConfig {
                raw: LOG,
                refined: BOARD,
                via: ConversionVia::ToolOnRaw,
                batch_limit: 50,
            }),
            deposit: log_deposit(),
            ..InventoryConfig::default()
        });
        let trigger = InventoryTrigger::StockCeiling {
            kind: LOG,
            count: 30,
            ceiling: 20,
        };

        let result = coordinator.check_and_run(&host, trigger).await;

        assert_eq!(result, Ok(InventoryOutcome::Converted { batches: 1 }));
        assert_eq!(host.count(BOARD, ContainerScope::Backpack), 30);
        assert!(host.travels().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deposit_that_leaves_the_pack_heavy_stops() {
        let host = MockHost::new()
            .with_item(1, ORE, 40, ContainerScope::Backpack)
            .with_weight(ORE, 10);
        let coordinator = coordinator(InventoryConfig {
            deposit: log_deposit(),
            ..InventoryConfig::default()
        });

        let result = coordinator.check_and_run(&host, HEAVY).await;

        assert_eq!(
            result,
            Err(TerminationReason::Overweight {
                weight: 400,
                maximum: 400
            })
        );
        assert_eq!(host.travels(), vec![SITE, Position::ORIGIN]);
        assert_eq!(host.count(ORE, ContainerScope::Backpack), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn restock_without_room_stops() {
        let host = MockHost::new()
            .with_status(|s| s.weight.maximum = 60)
            .with_item(1, SAW, 1, ContainerScope::Equipped)
            .with_item(2, BOARD, 30, ContainerScope::Backpack)
            .with_item(3, BOARD, 100, ContainerScope::Container(CRATE));
        let coordinator = coordinator(InventoryConfig {
            restock: board_restock(),
            ..InventoryConfig::default()
        });
        let trigger = InventoryTrigger::StockFloor {
            kind: BOARD,
            count: 30,
            floor: 40,
        };

        let result = coordinator.check_and_run(&host, trigger).await;

        assert_eq!(
            result,
            Err(TerminationReason::Overweight {
                weight: 31,
                maximum: 60
            })
        );
        assert_eq!(host.count(BOARD, ContainerScope::Container(CRATE)), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_restock_transfer_is_supply_exhausted() {
        let host = MockHost::new()
            .with_item(3, BOARD, 100, ContainerScope::Container(CRATE))
            .refusing_moves();
        let coordinator = coordinator(InventoryConfig {
            restock: board_restock(),
            ..InventoryConfig::default()
        });
        let trigger = InventoryTrigger::StockFloor {
            kind: BOARD,
            count: 0,
            floor: 10,
        };

        let result = coordinator.check_and_run(&host, trigger).await;

        assert_eq!(
            result,
            Err(TerminationReason::from(AgentError::SupplyExhausted { kind: BOARD }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restock_is_bounded_by_free_weight() {
        let host = MockHost::new()
            .with_status(|s| s.weight.maximum = 100)
            .with_item(3, BOARD, 100, ContainerScope::Container(CRATE));
        let coordinator = coordinator(InventoryConfig {
            restock: board_restock(),
            ..InventoryConfig::default()
        });
        let trigger = InventoryTrigger::StockFloor {
            kind: BOARD,
            count: 0,
            floor: 10,
        };

        let result = coordinator.check_and_run(&host, trigger).await;

        assert_eq!(result, Ok(InventoryOutcome::Restocked { amount: 50 }));
        assert_eq!(host.count(BOARD, ContainerScope::Backpack), 50);
    }
}
