//! Exercises the actix wiring end-to-end: two `ReplicaActor`s, connected
//! through `ActixBroadcastLayer`, converge on a shared counter.

use std::time::Duration;

use actix::Actor;

use causal_store::actor::{Connect, ReadRequest, ReplicaActor, UpdateRequest};
use causal_store::config::ReplicaConfig;
use causal_store::crdt::dispatch::{CrdtOperation, CrdtValue};
use causal_store::crdt::pn_counter_op::Op;
use causal_store::engine::batch::Update;
use causal_store::ids::ReplicaId;
use causal_store::key::{ObjectKey, TypeTag};
use causal_store::persistence::data_dir_for;
use causal_store::vector_clock::VectorClock;

#[actix_rt::test]
async fn two_connected_replicas_converge_on_a_shared_counter() {
    let dir = tempfile::tempdir().unwrap();
    let replica_a = ReplicaId(0);
    let replica_b = ReplicaId(1);
    let counter = ObjectKey::new(b"t".to_vec(), TypeTag::PnCounterOp, b"shared".to_vec());

    let addr_a =
        ReplicaActor::new(replica_a, ReplicaConfig::new(data_dir_for(dir.path(), replica_a))).unwrap().start();
    let addr_b =
        ReplicaActor::new(replica_b, ReplicaConfig::new(data_dir_for(dir.path(), replica_b))).unwrap().start();

    addr_a.send(Connect(replica_b, addr_b.clone().recipient())).await.unwrap();
    addr_b.send(Connect(replica_a, addr_a.clone().recipient())).await.unwrap();

    addr_a
        .send(UpdateRequest {
            batch: vec![Update::new(counter.clone(), CrdtOperation::PnCounterOp(Op::Increment(4)))],
            clock: VectorClock::new(),
        })
        .await
        .unwrap()
        .unwrap();
    addr_b
        .send(UpdateRequest {
            batch: vec![Update::new(counter.clone(), CrdtOperation::PnCounterOp(Op::Increment(6)))],
            clock: VectorClock::new(),
        })
        .await
        .unwrap()
        .unwrap();

    actix_rt::time::sleep(Duration::from_millis(50)).await;

    let (values_a, _) =
        addr_a.send(ReadRequest { keys: vec![counter.clone()], clock: VectorClock::new() }).await.unwrap().unwrap();
    let (values_b, _) =
        addr_b.send(ReadRequest { keys: vec![counter.clone()], clock: VectorClock::new() }).await.unwrap().unwrap();

    assert_eq!(values_a[0].1, CrdtValue::Int(10));
    assert_eq!(values_b[0].1, CrdtValue::Int(10));
}
