//! A fully wired Platter deployment over the in-memory ledgers.

use platter_core::ledger::{CurrencyLedger, MemoryLedger};
use platter_core::tokens::{MemoryNft, MemoryStakeToken};
use platter_core::types::AccountId;
use platter_emitter::EmissionSchedule;
use platter_listeners::{StakedListenerLedger, UniqueListenerLedger};
use platter_turntables::TurntableRegistry;

pub const EMISSION: u64 = 1_000_000;

pub fn acct(seed: u8) -> AccountId {
    AccountId::from_seed(seed)
}

pub fn admin() -> AccountId {
    acct(0xAD)
}

pub fn alice() -> AccountId {
    acct(1)
}

pub fn bob() -> AccountId {
    acct(2)
}

pub fn carol() -> AccountId {
    acct(3)
}

pub fn dan() -> AccountId {
    acct(4)
}

/// Every component of the system wired against the in-memory ledgers.
///
/// Pool weights: a pass-through forwarder (400), the turntable registry
/// (400), the unique-id listener ledger (100), and the staked listener
/// ledger (100). The schedule starts at block 0.
pub struct World {
    pub ledger: MemoryLedger,
    pub emitter: EmissionSchedule,
    pub registry: TurntableRegistry,
    pub unique: UniqueListenerLedger,
    pub staked: StakedListenerLedger,
    pub nft: MemoryNft,
    pub stake: MemoryStakeToken,
    pub forwarder: AccountId,
}

impl World {
    pub fn new() -> Self {
        let mut ledger = MemoryLedger::new(acct(0xFE));
        let emitter_account = acct(0xE0);
        ledger.set_minter(emitter_account);

        let mut emitter = EmissionSchedule::new(admin(), emitter_account, EMISSION);
        let registry = TurntableRegistry::new(admin(), acct(0xC0), 1, 2);
        let unique = UniqueListenerLedger::new(admin(), acct(0xD0), 2);
        let staked = StakedListenerLedger::new(admin(), acct(0xD1), 3);

        let forwarder = acct(0xA0);
        emitter.add_pool(admin(), 0, forwarder, 400).unwrap();
        emitter.add_pool(admin(), 0, registry.account(), 400).unwrap();
        emitter.add_pool(admin(), 0, unique.account(), 100).unwrap();
        emitter.add_pool(admin(), 0, staked.account(), 100).unwrap();
        emitter.start(admin(), 0).unwrap();

        let mut nft = MemoryNft::new();
        for _ in 0..3 {
            nft.mint(alice()); // ids 0, 1, 2
        }
        for _ in 0..2 {
            nft.mint(bob()); // ids 3, 4
        }
        nft.mint(carol()); // id 5

        let mut stake = MemoryStakeToken::new();
        for who in [alice(), bob(), carol(), dan()] {
            stake.mint(who, 10_000);
        }

        for who in [alice(), bob(), carol(), dan()] {
            ledger.issue(who, 1_000_000);
        }

        World {
            ledger,
            emitter,
            registry,
            unique,
            staked,
            nft,
            stake,
            forwarder,
        }
    }

    /// Every account that can hold currency in these tests.
    pub fn holders(&self) -> Vec<AccountId> {
        vec![
            alice(),
            bob(),
            carol(),
            dan(),
            admin(),
            self.forwarder,
            self.registry.account(),
            self.unique.account(),
            self.staked.account(),
            self.ledger.fee_sink(),
        ]
    }

    /// Sum of all holder balances; equals total supply when no currency
    /// has leaked.
    pub fn circulating(&self) -> u64 {
        self.holders()
            .into_iter()
            .map(|who| self.ledger.balance_of(who))
            .sum()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer-division drift tolerance, in the spirit of the accrual math:
/// every floor loses at most one unit per claimant.
pub fn assert_close(actual: u64, expected: u64, tolerance: u64) {
    let diff = actual.abs_diff(expected);
    assert!(
        diff <= tolerance,
        "expected {expected} ± {tolerance}, got {actual} (diff {diff})"
    );
}
