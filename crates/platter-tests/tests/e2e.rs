//! End-to-end lifecycle: purchases, owner claims, recharges, listener
//! ledgers on top, destruction, expiry, and conservation.

use platter_core::ledger::CurrencyLedger;
use platter_core::tokens::StakeToken;
use platter_tests::helpers::*;

/// Registry pool: weight 400 of 1000.
const REGISTRY_PER_BLOCK: u64 = EMISSION * 400 / 1_000;
/// Each listener pool: weight 100 of 1000.
const LISTENER_PER_BLOCK: u64 = EMISSION * 100 / 1_000;

#[test]
fn full_lifecycle() {
    let mut w = World::new();
    let t0 = w.registry.add_type(admin(), 1_000, 500, 10, 300).unwrap();
    let t1 = w.registry.add_type(admin(), 2_000, 1_000, 20, 600).unwrap();
    w.registry.allow_type(admin(), t0).unwrap();
    w.registry.allow_type(admin(), t1).unwrap();

    // Block 100: alice buys a type-0 turntable, bob a type-1.
    let a0 = w
        .registry
        .buy(alice(), &mut w.ledger, &mut w.emitter, 100, t0)
        .unwrap();
    let b1 = w
        .registry
        .buy(bob(), &mut w.ledger, &mut w.emitter, 100, t1)
        .unwrap();
    assert_eq!(w.registry.total_volume(), 30);
    assert_eq!(w.registry.turntable(a0).unwrap().end_block, 400);
    assert_eq!(w.registry.turntable(b1).unwrap().end_block, 700);

    // Block 200: owners claim; the registry stream splits 10:20.
    let paid_a = w
        .registry
        .claim(alice(), &mut w.ledger, &mut w.emitter, 200, &[a0])
        .unwrap();
    assert_close(paid_a, REGISTRY_PER_BLOCK * 100 / 3, 10);
    let paid_b = w
        .registry
        .claim(bob(), &mut w.ledger, &mut w.emitter, 200, &[b1])
        .unwrap();
    assert_close(paid_b, REGISTRY_PER_BLOCK * 100 * 2 / 3, 10);

    // Block 200: carol starts listening to a0; 200 blocks of listener
    // backlog burn on the first listen.
    let sink = w.ledger.balance_of(w.ledger.fee_sink());
    w.unique
        .listen(carol(), &mut w.ledger, &mut w.emitter, &w.registry, &w.nft, 200, a0, &[5])
        .unwrap();
    assert_eq!(
        w.ledger.balance_of(w.ledger.fee_sink()),
        sink + LISTENER_PER_BLOCK * 200 * 30 / 10_000
    );

    // Block 250: alice recharges a0: 600 burned, 600·300·2/1000 = 360
    // blocks added.
    w.registry
        .charge(alice(), &mut w.ledger, &mut w.emitter, 250, a0, 600)
        .unwrap();
    assert_eq!(w.registry.turntable(a0).unwrap().end_block, 760);

    // Block 300: carol claims; the 3% fee goes to a0's owner alice.
    let alice_balance = w.ledger.balance_of(alice());
    let net = w
        .unique
        .claim(carol(), &mut w.ledger, &mut w.emitter, &w.registry, &w.nft, 300, a0, &[5])
        .unwrap();
    let gross = LISTENER_PER_BLOCK * 100;
    assert_eq!(net, gross * 97 / 100);
    assert_eq!(
        w.ledger.balance_of(alice()),
        alice_balance + gross * 3 / 100
    );

    // Block 300: bob destroys b1: pending pays out, 1_000 refunds, the
    // other 1_000 of the price burns.
    let bob_balance = w.ledger.balance_of(bob());
    let sink = w.ledger.balance_of(w.ledger.fee_sink());
    w.registry
        .destroy(bob(), &mut w.ledger, &mut w.emitter, 300, b1)
        .unwrap();
    assert_close(
        w.ledger.balance_of(bob()),
        bob_balance + REGISTRY_PER_BLOCK * 100 * 2 / 3 + 1_000,
        10,
    );
    assert_eq!(
        w.ledger.balance_of(w.ledger.fee_sink()),
        sink + 1_000 * 30 / 10_000
    );
    assert_eq!(w.registry.total_volume(), 10);
    assert!(!w.registry.exists(b1));

    // Block 300: dan stakes 50 on a0 in the staked ledger; that ledger's
    // own 300-block backlog burns.
    let sink = w.ledger.balance_of(w.ledger.fee_sink());
    w.staked
        .listen(dan(), &mut w.ledger, &mut w.emitter, &w.registry, &mut w.stake, 300, a0, 50)
        .unwrap();
    assert_eq!(
        w.ledger.balance_of(w.ledger.fee_sink()),
        sink + LISTENER_PER_BLOCK * 300 * 30 / 10_000
    );

    // Block 350: dan claims (sole staker takes the whole stream).
    let alice_balance = w.ledger.balance_of(alice());
    let net = w
        .staked
        .claim(dan(), &mut w.ledger, &mut w.emitter, &w.registry, 350, a0)
        .unwrap();
    let gross = LISTENER_PER_BLOCK * 50;
    assert_eq!(net, gross * 97 / 100);
    assert_eq!(
        w.ledger.balance_of(alice()),
        alice_balance + gross * 3 / 100
    );

    // Block 350: alice claims a0: fifty blocks at a third of the stream,
    // then fifty more at the full stream after b1's destruction.
    let paid = w
        .registry
        .claim(alice(), &mut w.ledger, &mut w.emitter, 350, &[a0])
        .unwrap();
    assert_close(
        paid,
        REGISTRY_PER_BLOCK * 50 / 3 + REGISTRY_PER_BLOCK * 50,
        10,
    );

    // Block 800: a0 expired at 760. The 350..800 span splits 410 lived
    // blocks paid, 40 expired blocks burned.
    let sink = w.ledger.balance_of(w.ledger.fee_sink());
    let paid = w
        .registry
        .claim(alice(), &mut w.ledger, &mut w.emitter, 800, &[a0])
        .unwrap();
    let accrued = REGISTRY_PER_BLOCK * 450;
    assert_eq!(paid, accrued * 410 / 450);
    let burned = accrued - accrued * 410 / 450;
    assert_eq!(
        w.ledger.balance_of(w.ledger.fee_sink()),
        sink + burned * 30 / 10_000
    );

    // Wind down the listeners; stakes and pending rewards come home.
    w.staked
        .unlisten(dan(), &mut w.ledger, &mut w.emitter, &w.registry, &mut w.stake, 810, a0)
        .unwrap();
    assert_eq!(w.stake.balance_of(dan()), 10_000);
    w.unique
        .unlisten(carol(), &mut w.ledger, &mut w.emitter, &w.registry, &w.nft, 810, a0, &[5])
        .unwrap();
    assert!(!w.unique.listening(5));

    // No currency leaked anywhere along the way.
    assert_eq!(w.circulating(), w.ledger.total_supply());
}

#[test]
fn forwarder_pool_receives_its_share() {
    // The emission schedule serves plain recipient pools with the same
    // settle contract the registry uses.
    let mut w = World::new();
    let minted = w.emitter.settle(&mut w.ledger, 100, 0).unwrap();
    assert_eq!(minted, EMISSION * 100 * 400 / 1_000);
    assert_eq!(w.ledger.balance_of(w.forwarder), minted);

    // Same block again: nothing more.
    assert_eq!(w.emitter.settle(&mut w.ledger, 100, 0).unwrap(), 0);
}

#[test]
fn listener_ledgers_are_independent_pools() {
    let mut w = World::new();
    let t = w.registry.add_type(admin(), 1_000, 500, 10, 300).unwrap();
    w.registry.allow_type(admin(), t).unwrap();
    let id = w
        .registry
        .buy(alice(), &mut w.ledger, &mut w.emitter, 10, t)
        .unwrap();

    // carol in the unique ledger, dan in the staked ledger; each takes
    // the whole of their own pool's stream.
    w.unique
        .listen(carol(), &mut w.ledger, &mut w.emitter, &w.registry, &w.nft, 10, id, &[5])
        .unwrap();
    w.staked
        .listen(dan(), &mut w.ledger, &mut w.emitter, &w.registry, &mut w.stake, 10, id, 999)
        .unwrap();

    let net_c = w
        .unique
        .claim(carol(), &mut w.ledger, &mut w.emitter, &w.registry, &w.nft, 20, id, &[5])
        .unwrap();
    let net_d = w
        .staked
        .claim(dan(), &mut w.ledger, &mut w.emitter, &w.registry, 20, id)
        .unwrap();
    assert_eq!(net_c, LISTENER_PER_BLOCK * 10 * 97 / 100);
    assert_eq!(net_d, LISTENER_PER_BLOCK * 10 * 97 / 100);
}
