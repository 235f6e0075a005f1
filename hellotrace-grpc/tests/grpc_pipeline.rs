//! End-to-end pipeline tests over a real tonic transport.
//!
//! Each test boots the greeting service on an ephemeral loopback port and
//! drives it with a real gRPC client, so deadline metadata and status
//! codes travel the wire exactly as they would in production.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Code, Request};

use hellotrace_grpc::store::{GreetingRecord, GreetingStore, RepositoryError};
use hellotrace_grpc::{GreeterService, InMemoryReplyCache};
use hellotrace_proto::greeter::greeter_client::GreeterClient;
use hellotrace_proto::greeter::greeter_server::GreeterServer;
use hellotrace_proto::greeter::HelloRequest;

struct CountingStore {
    inserts: AtomicUsize,
    next_id: AtomicI64,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inserts: AtomicUsize::new(0),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait::async_trait]
impl GreetingStore for CountingStore {
    async fn insert_greeting(&self, _record: &GreetingRecord) -> Result<i64, RepositoryError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

async fn spawn_service() -> (SocketAddr, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::new());
    let cache = Arc::new(InMemoryReplyCache::new());
    let greeter = GreeterService::new(store.clone(), cache);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        Server::builder()
            .add_service(GreeterServer::new(greeter))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("serve");
    });

    (addr, store)
}

async fn connect(addr: SocketAddr) -> GreeterClient<tonic::transport::Channel> {
    GreeterClient::connect(format!("http://{addr}"))
        .await
        .expect("connect")
}

fn request_with_deadline(name: &str) -> Request<HelloRequest> {
    let mut request = Request::new(HelloRequest {
        name: name.to_string(),
    });
    request.set_timeout(Duration::from_secs(8));
    request
}

#[tokio::test]
async fn greeting_is_persisted_and_formatted() {
    let (addr, store) = spawn_service().await;
    let mut client = connect(addr).await;

    let reply = client
        .say_hello(request_with_deadline("John"))
        .await
        .expect("say_hello")
        .into_inner();

    assert!(reply.message.starts_with("John said hello at "));
    assert!(reply.message.ends_with(" UTC."));
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeat_greeting_is_served_from_cache() {
    let (addr, store) = spawn_service().await;
    let mut client = connect(addr).await;

    let first = client
        .say_hello(request_with_deadline("John"))
        .await
        .expect("first call")
        .into_inner();
    let second = client
        .say_hello(request_with_deadline("John"))
        .await
        .expect("second call")
        .into_inner();

    assert_eq!(first.message, second.message);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_deadline_is_cancelled() {
    let (addr, store) = spawn_service().await;
    let mut client = connect(addr).await;

    let status = client
        .say_hello(Request::new(HelloRequest {
            name: "John".to_string(),
        }))
        .await
        .expect_err("should be rejected");

    assert_eq!(status.code(), Code::Cancelled);
    assert_eq!(status.message(), "No Deadline Supplied");
    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_name_is_invalid_argument() {
    let (addr, _store) = spawn_service().await;
    let mut client = connect(addr).await;

    let status = client
        .say_hello(request_with_deadline("  "))
        .await
        .expect_err("should be rejected");

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "'Name' is Required");
}

#[tokio::test]
async fn reserved_name_is_invalid_argument() {
    let (addr, _store) = spawn_service().await;
    let mut client = connect(addr).await;

    let status = client
        .say_hello(request_with_deadline("mud"))
        .await
        .expect_err("should be rejected");

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "Your name is not Mud");
}
