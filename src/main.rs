//! A small runnable demonstration: two replicas, connected to each other,
//! converge on a shared counter after exchanging a handful of updates.

use std::time::Duration;

use actix::{Actor, System};
use tracing_subscriber::EnvFilter;

use causal_store::actor::{Connect, ReadRequest, ReplicaActor, UpdateRequest};
use causal_store::config::ReplicaConfig;
use causal_store::crdt::dispatch::CrdtOperation;
use causal_store::crdt::pn_counter_op::Op;
use causal_store::engine::batch::Update;
use causal_store::ids::ReplicaId;
use causal_store::key::{ObjectKey, TypeTag};
use causal_store::vector_clock::VectorClock;

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let system = System::new();
    let key = ObjectKey::new(b"demo".to_vec(), TypeTag::PnCounterOp, b"visits".to_vec());

    system.block_on(async move {
        let base = std::env::temp_dir().join("causal-store-demo");
        let _ = std::fs::remove_dir_all(&base);

        let replica_a = ReplicaId(0);
        let replica_b = ReplicaId(1);

        let config_a = ReplicaConfig::new(causal_store::persistence::data_dir_for(&base, replica_a));
        let config_b = ReplicaConfig::new(causal_store::persistence::data_dir_for(&base, replica_b));

        let addr_a = ReplicaActor::new(replica_a, config_a).expect("replica 0 recovery").start();
        let addr_b = ReplicaActor::new(replica_b, config_b).expect("replica 1 recovery").start();

        addr_a.send(Connect(replica_b, addr_b.clone().recipient())).await.unwrap();
        addr_b.send(Connect(replica_a, addr_a.clone().recipient())).await.unwrap();

        // Two increments on replica 0, one on replica 1, each issued against
        // that replica's own empty dependency clock (a first call).
        for _ in 0..2 {
            addr_a
                .send(UpdateRequest {
                    batch: vec![Update::new(key.clone(), CrdtOperation::PnCounterOp(Op::Increment(1)))],
                    clock: VectorClock::new(),
                })
                .await
                .unwrap()
                .expect("update on replica 0");
        }
        addr_b
            .send(UpdateRequest {
                batch: vec![Update::new(key.clone(), CrdtOperation::PnCounterOp(Op::Increment(1)))],
                clock: VectorClock::new(),
            })
            .await
            .unwrap()
            .expect("update on replica 1");

        // Give the fire-and-forget broadcast a beat to land before reading.
        actix_rt::time::sleep(Duration::from_millis(50)).await;

        let (values_a, _) = addr_a
            .send(ReadRequest { keys: vec![key.clone()], clock: VectorClock::new() })
            .await
            .unwrap()
            .expect("read on replica 0");
        let (values_b, _) = addr_b
            .send(ReadRequest { keys: vec![key.clone()], clock: VectorClock::new() })
            .await
            .unwrap()
            .expect("read on replica 1");

        println!("replica 0 sees {:?}", values_a);
        println!("replica 1 sees {:?}", values_b);

        System::current().stop();
    });

    system.run().unwrap();
}
