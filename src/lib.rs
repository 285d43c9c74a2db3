//! Liquid-staking coordinator.
//!
//! A polling daemon that drives a set of CosmWasm liquid-staking contracts:
//! it ticks the core state machine, sweeps pump ICAs, pushes staker funds
//! over IBC, relays validator stats and distributes splitter balances, all
//! on a fixed schedule with a watchdog keeping the process honest.

pub mod chain;
pub mod config;
pub mod contracts;
pub mod errors;
pub mod factory;
pub mod metrics;
pub mod modules;
pub mod observability;
pub mod scheduler;
pub mod wallet;
