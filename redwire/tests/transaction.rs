//! End-to-end transaction tests against the dispatching mock server.

mod common;

use common::MockRedis;
use redwire::{Client, ConnectionConfig, Error};

async fn connect(server: &MockRedis) -> Client {
    Client::connect(ConnectionConfig::new(server.url()))
        .await
        .unwrap()
}

#[tokio::test]
async fn exec_applies_queued_commands_in_order() {
    let server = MockRedis::start().await;
    let client = connect(&server).await;

    let mut txn = client.transaction();
    let set = txn.set("account", "100");
    let debit = txn.incr_by("account", -25);
    txn.exec().await.unwrap();

    assert!(set.take().unwrap());
    assert_eq!(debit.take().unwrap(), 75);
    assert_eq!(server.value("account").await.as_deref(), Some("75"));
}

#[tokio::test]
async fn watch_on_an_untouched_key_commits() {
    let server = MockRedis::start().await;
    let client = connect(&server).await;
    client.set("balance", "10").await.unwrap();

    let mut txn = client.transaction();
    txn.watch("balance");
    let after = txn.incr("balance");
    txn.exec().await.unwrap();

    assert_eq!(after.take().unwrap(), 11);
}

#[tokio::test]
async fn nothing_runs_before_exec() {
    let server = MockRedis::start().await;
    let client = connect(&server).await;

    let mut txn = client.transaction();
    txn.set("queued-only", "yes");
    assert_eq!(server.value("queued-only").await, None);

    txn.exec().await.unwrap();
    assert_eq!(server.value("queued-only").await.as_deref(), Some("yes"));
}

#[tokio::test]
async fn discard_never_touches_the_server() {
    let server = MockRedis::start().await;
    let client = connect(&server).await;

    let mut txn = client.transaction();
    let handle = txn.set("abandoned", "x");
    txn.discard();

    assert!(matches!(handle.take(), Err(Error::BatchDiscarded)));
    assert_eq!(server.value("abandoned").await, None);
}

#[tokio::test]
async fn empty_transaction_is_a_no_op() {
    let server = MockRedis::start().await;
    let client = connect(&server).await;
    client.transaction().exec().await.unwrap();
}
