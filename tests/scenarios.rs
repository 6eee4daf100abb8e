//! End-to-end scenarios against a real `TcpListener`, mirroring the six
//! concrete scenarios and the cross-cutting testable properties of
//! `spec.md` §8. Unlike the unit suites in each module, these drive the
//! whole stack — codec, store, registry, txn, dispatcher, connection,
//! server — over an actual socket.
use std::time::Duration;

use bytes::Bytes;
use nanored::{Client, Frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(nanored::server::run(listener, 50, std::future::pending::<()>()));
    addr
}

async fn connect(addr: std::net::SocketAddr) -> Client {
    Client::connect(addr).await.unwrap()
}

fn bulk(s: &str) -> Bytes {
    Bytes::from(s.to_string())
}

// Scenario 1 — basic round trip.
#[tokio::test]
async fn basic_round_trip() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.set("framework", bulk("Netty")).await.unwrap();
    assert_eq!(client.get("framework").await.unwrap(), Some(bulk("Netty")));
    assert_eq!(client.del(&["framework"]).await.unwrap(), 1);
    assert_eq!(client.get("framework").await.unwrap(), None);
}

// Scenario 2 — TTL lifecycle.
#[tokio::test]
async fn ttl_lifecycle() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.set_expires("k", bulk("v"), Duration::from_secs(1)).await.unwrap();
    let ttl = client.ttl("k").await.unwrap();
    assert!((0..=1).contains(&ttl), "expected ttl in [0,1], got {ttl}");

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(client.get("k").await.unwrap(), None);
    assert_eq!(client.ttl("k").await.unwrap(), -2);
}

// Scenario 3 — transaction with a mid-batch WRONGTYPE failure.
#[tokio::test]
async fn transaction_mid_batch_failure_does_not_abort_the_batch() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.set("ctr", bulk("10")).await.unwrap();
    assert_eq!(client.command(&[bulk("MULTI")]).await.unwrap(), Frame::ok());
    assert_eq!(
        client.command(&[bulk("INCR"), bulk("ctr")]).await.unwrap(),
        Frame::SimpleString("QUEUED".to_string())
    );
    assert_eq!(
        client.command(&[bulk("LPUSH"), bulk("ctr"), bulk("x")]).await.unwrap(),
        Frame::SimpleString("QUEUED".to_string())
    );
    assert_eq!(
        client.command(&[bulk("INCR"), bulk("ctr")]).await.unwrap(),
        Frame::SimpleString("QUEUED".to_string())
    );

    match client.command(&[bulk("EXEC")]).await.unwrap() {
        Frame::Array(replies) => {
            assert_eq!(replies.len(), 3);
            assert_eq!(replies[0], Frame::Integer(11));
            match &replies[1] {
                Frame::SimpleError(e) => assert!(e.starts_with("WRONGTYPE")),
                other => panic!("expected WRONGTYPE, got {other:?}"),
            }
            assert_eq!(replies[2], Frame::Integer(12));
        }
        other => panic!("expected array reply, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_command_during_queuing_poisons_exec() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.command(&[bulk("MULTI")]).await.unwrap();
    match client.command(&[bulk("NOTACOMMAND")]).await.unwrap() {
        Frame::SimpleError(e) => assert!(e.starts_with("ERR unknown command")),
        other => panic!("unexpected {other:?}"),
    }
    match client.command(&[bulk("EXEC")]).await.unwrap() {
        Frame::SimpleError(e) => assert!(e.starts_with("EXECABORT")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn nested_multi_replies_the_canonical_single_line_error() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.command(&[bulk("MULTI")]).await.unwrap();
    match client.command(&[bulk("MULTI")]).await.unwrap() {
        Frame::SimpleError(e) => assert_eq!(e, "ERR MULTI calls can not be nested"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn transactions_are_isolated_per_connection() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;

    a.command(&[bulk("MULTI")]).await.unwrap();
    // `b` must be able to run a plain command and start its own transaction
    // while `a` is mid-MULTI, since transaction state never crosses
    // connections (`spec.md` §4.5, §5).
    assert_eq!(b.ping(None).await.unwrap(), Bytes::from("PONG"));
    assert_eq!(b.command(&[bulk("MULTI")]).await.unwrap(), Frame::ok());
    assert_eq!(b.command(&[bulk("EXEC")]).await.unwrap(), Frame::Array(vec![]));
}

// Scenario 4 — pipelined SET/GET delivered across fragmented TCP segments.
#[tokio::test]
async fn pipelined_request_survives_tcp_fragmentation() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let whole = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n";
    for chunk in whole.chunks(3) {
        stream.write_all(chunk).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let mut buf = vec![0u8; 1024];
    let mut received = Vec::new();
    while received.len() < b"+OK\r\n$1\r\nv\r\n".len() {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed early");
        received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(received, b"+OK\r\n$1\r\nv\r\n");
}

// Scenario 5 — stream range.
#[tokio::test]
async fn stream_add_and_range() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    assert_eq!(
        client.command(&[bulk("XADD"), bulk("s"), bulk("1-0"), bulk("a"), bulk("1")]).await.unwrap(),
        Frame::BulkString(bulk("1-0"))
    );
    assert_eq!(
        client.command(&[bulk("XADD"), bulk("s"), bulk("2-0"), bulk("a"), bulk("2")]).await.unwrap(),
        Frame::BulkString(bulk("2-0"))
    );
    match client.command(&[bulk("XADD"), bulk("s"), bulk("1-5"), bulk("a"), bulk("3")]).await.unwrap() {
        Frame::SimpleError(_) => {}
        other => panic!("expected an error for a non-increasing id, got {other:?}"),
    }

    match client.command(&[bulk("XRANGE"), bulk("s"), bulk("-"), bulk("+")]).await.unwrap() {
        Frame::Array(entries) => {
            assert_eq!(entries.len(), 2);
            match &entries[0] {
                Frame::Array(pair) => assert_eq!(pair[0], Frame::BulkString(bulk("1-0"))),
                other => panic!("unexpected {other:?}"),
            }
            match &entries[1] {
                Frame::Array(pair) => assert_eq!(pair[0], Frame::BulkString(bulk("2-0"))),
                other => panic!("unexpected {other:?}"),
            }
        }
        other => panic!("expected array, got {other:?}"),
    }
}

// Scenario 6 — cross-connection blocking: BLPOP on one connection resolves
// once another connection RPUSHes to the same key.
#[tokio::test]
async fn cross_connection_blpop_resolves_on_push() {
    let addr = spawn_server().await;
    let mut waiter = connect(addr).await;
    let mut pusher = connect(addr).await;

    let blocked = tokio::spawn(async move {
        waiter.command(&[bulk("BLPOP"), bulk("q"), bulk("5")]).await.unwrap()
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    pusher.command(&[bulk("RPUSH"), bulk("q"), bulk("hello")]).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(1), blocked).await.unwrap().unwrap();
    match reply {
        Frame::Array(items) => {
            assert_eq!(items, vec![Frame::BulkString(bulk("q")), Frame::BulkString(bulk("hello"))]);
        }
        other => panic!("expected [key, value], got {other:?}"),
    }
}

#[tokio::test]
async fn blpop_times_out_to_nil_array_on_an_empty_key() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    let start = tokio::time::Instant::now();
    let reply = client.command(&[bulk("BLPOP"), bulk("nope"), bulk("0.1")]).await.unwrap();
    assert_eq!(reply, Frame::NullArray);
    assert!(start.elapsed() < Duration::from_millis(500), "timeout took too long");
}

#[tokio::test]
async fn blpop_skips_wrong_typed_keys_and_checks_the_next_one() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.set("astring", bulk("v")).await.unwrap();
    client.command(&[bulk("RPUSH"), bulk("alist"), bulk("hi")]).await.unwrap();

    match client
        .command(&[bulk("BLPOP"), bulk("astring"), bulk("alist"), bulk("0")])
        .await
        .unwrap()
    {
        Frame::Array(items) => assert_eq!(items, vec![Frame::BulkString(bulk("alist")), Frame::BulkString(bulk("hi"))]),
        other => panic!("expected the wrong-typed key to be skipped, got {other:?}"),
    }
}

#[tokio::test]
async fn lpush_and_lrange_order() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.command(&[bulk("LPUSH"), bulk("l"), bulk("a"), bulk("b"), bulk("c")]).await.unwrap();
    match client.command(&[bulk("LRANGE"), bulk("l"), bulk("0"), bulk("-1")]).await.unwrap() {
        Frame::Array(items) => assert_eq!(
            items,
            vec![Frame::BulkString(bulk("c")), Frame::BulkString(bulk("b")), Frame::BulkString(bulk("a"))]
        ),
        other => panic!("unexpected {other:?}"),
    }
}

// An empty request array is silently skipped (`spec.md` §4.6): no reply is
// written for it, and the connection carries straight on to the next frame.
#[tokio::test]
async fn empty_array_frame_gets_no_reply_but_does_not_break_the_connection() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"*0\r\n*1\r\n$4\r\nPING\r\n").await.unwrap();

    let mut buf = vec![0u8; 1024];
    let mut received = Vec::new();
    while received.len() < b"+PONG\r\n".len() {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed early");
        received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(received, b"+PONG\r\n");
}

#[tokio::test]
async fn overwrite_without_ttl_clears_previous_expiry_end_to_end() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client.set_expires("k", bulk("v1"), Duration::from_secs(1)).await.unwrap();
    client.set("k", bulk("v2")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(client.get("k").await.unwrap(), Some(bulk("v2")));
    assert_eq!(client.ttl("k").await.unwrap(), -1);
}
