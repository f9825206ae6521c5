//! Property tests for the convergence laws the scenario tests only probe
//! at specific points: idempotence under redelivery and commutativity of
//! concurrent effects.

use proptest::prelude::*;

use causal_store::crdt::dispatch::{CrdtOperation, CrdtValue};
use causal_store::crdt::{aw_set, pn_counter_op};
use causal_store::engine::batch::Update;
use causal_store::engine::{GateOutcome, ReplicaEngine};
use causal_store::ids::ReplicaId;
use causal_store::key::{ObjectKey, TypeTag};
use causal_store::vector_clock::VectorClock;

fn key(type_tag: TypeTag, id: &str) -> ObjectKey {
    ObjectKey::new(b"t".to_vec(), type_tag, id.as_bytes().to_vec())
}

fn ready_update(engine: &mut ReplicaEngine, batch: Vec<Update>) -> causal_store::engine::batch::LocalBatchOutcome {
    match engine.update(batch, VectorClock::new()) {
        GateOutcome::Ready(result) => result.expect("update accepted"),
        GateOutcome::Pending(_) => panic!("update unexpectedly deferred"),
    }
}

fn ready_value(engine: &mut ReplicaEngine, k: ObjectKey) -> CrdtValue {
    match engine.read(vec![k], VectorClock::new()) {
        GateOutcome::Ready(result) => result.expect("read succeeds").0.remove(0).1,
        GateOutcome::Pending(_) => panic!("read unexpectedly deferred"),
    }
}

fn element_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

proptest! {
    // Idempotence: redelivering the same effect is a no-op past the first
    // application. The engine, not the CRDT itself, is what guarantees this
    // (it de-duplicates by origin/origin_seq before the effect ever reaches
    // the CRDT's `apply`), so the property is exercised through
    // `ReplicaEngine::apply_remote`.
    #[test]
    fn redelivering_a_counter_effect_does_not_change_the_value(amount in 1u64..10_000) {
        let counter = key(TypeTag::PnCounterOp, "c");
        let mut origin = ReplicaEngine::new(ReplicaId(0));
        let outcome = ready_update(
            &mut origin,
            vec![Update::new(counter.clone(), CrdtOperation::PnCounterOp(pn_counter_op::Op::Increment(amount)))],
        );
        let envelope = outcome.envelopes.into_iter().next().unwrap();

        let mut once = ReplicaEngine::new(ReplicaId(1));
        once.apply_remote(envelope.clone());

        let mut twice = ReplicaEngine::new(ReplicaId(1));
        twice.apply_remote(envelope.clone());
        twice.apply_remote(envelope);

        prop_assert_eq!(ready_value(&mut once, counter.clone()), ready_value(&mut twice, counter));
    }

    #[test]
    fn redelivering_an_add_wins_set_effect_does_not_change_the_value(element in element_strategy()) {
        let set = key(TypeTag::AwSet, "s");
        let mut origin = ReplicaEngine::new(ReplicaId(0));
        let outcome = ready_update(
            &mut origin,
            vec![Update::new(set.clone(), CrdtOperation::AwSet(aw_set::Op::Add(element)))],
        );
        let envelope = outcome.envelopes.into_iter().next().unwrap();

        let mut once = ReplicaEngine::new(ReplicaId(1));
        once.apply_remote(envelope.clone());

        let mut twice = ReplicaEngine::new(ReplicaId(1));
        twice.apply_remote(envelope.clone());
        twice.apply_remote(envelope);

        prop_assert_eq!(ready_value(&mut once, set.clone()), ready_value(&mut twice, set));
    }

    // Commutativity: two concurrent effects on the same key converge
    // regardless of delivery order.
    #[test]
    fn concurrent_counter_effects_commute(a in 1u64..10_000, b in 1u64..10_000) {
        let counter = key(TypeTag::PnCounterOp, "c");

        let mut origin_a = ReplicaEngine::new(ReplicaId(0));
        let effect_a = ready_update(
            &mut origin_a,
            vec![Update::new(counter.clone(), CrdtOperation::PnCounterOp(pn_counter_op::Op::Increment(a)))],
        )
        .envelopes
        .into_iter()
        .next()
        .unwrap();

        let mut origin_b = ReplicaEngine::new(ReplicaId(1));
        let effect_b = ready_update(
            &mut origin_b,
            vec![Update::new(counter.clone(), CrdtOperation::PnCounterOp(pn_counter_op::Op::Decrement(b)))],
        )
        .envelopes
        .into_iter()
        .next()
        .unwrap();

        let mut ab = ReplicaEngine::new(ReplicaId(2));
        ab.apply_remote(effect_a.clone());
        ab.apply_remote(effect_b.clone());

        let mut ba = ReplicaEngine::new(ReplicaId(2));
        ba.apply_remote(effect_b);
        ba.apply_remote(effect_a);

        prop_assert_eq!(ready_value(&mut ab, counter.clone()), ready_value(&mut ba, counter));
    }

    #[test]
    fn concurrent_add_and_remove_on_an_add_wins_set_commute(element in element_strategy()) {
        let set = key(TypeTag::AwSet, "s");

        // Both origins start from an empty set, so the remove's observed-set
        // of add-tokens is empty: it cannot have seen the concurrent add.
        let mut origin_add = ReplicaEngine::new(ReplicaId(0));
        let add_effect = ready_update(
            &mut origin_add,
            vec![Update::new(set.clone(), CrdtOperation::AwSet(aw_set::Op::Add(element.clone())))],
        )
        .envelopes
        .into_iter()
        .next()
        .unwrap();

        let mut origin_remove = ReplicaEngine::new(ReplicaId(1));
        let remove_effect = ready_update(
            &mut origin_remove,
            vec![Update::new(set.clone(), CrdtOperation::AwSet(aw_set::Op::Remove(element)))],
        )
        .envelopes
        .into_iter()
        .next()
        .unwrap();

        let mut add_then_remove = ReplicaEngine::new(ReplicaId(2));
        add_then_remove.apply_remote(add_effect.clone());
        add_then_remove.apply_remote(remove_effect.clone());

        let mut remove_then_add = ReplicaEngine::new(ReplicaId(2));
        remove_then_add.apply_remote(remove_effect);
        remove_then_add.apply_remote(add_effect);

        prop_assert_eq!(
            ready_value(&mut add_then_remove, set.clone()),
            ready_value(&mut remove_then_add, set)
        );
    }
}
