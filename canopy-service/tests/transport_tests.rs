use canopy_model::{FieldRegistry, NodeField, NodeType};
use canopy_service::framing::{read_frame, write_frame};
use canopy_service::protocol::{ErrorMessage, NodeArgs};
use canopy_service::{NodeClient, RpcTransport, ServiceError, ServiceRequest, ServiceResponse, StreamTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::DuplexStream;

/// Answers requests on `stream` the way a data daemon would, until it closes.
async fn serve(mut stream: DuplexStream) {
    while let Ok(request) = read_frame::<ServiceRequest, _>(&mut stream).await {
        let response = match request {
            ServiceRequest::GetNode(args) if args.path == "/about" => ServiceResponse::Data(
                br#"{"Type": "core.Document", "Fields": {"core": {"Title": "About"}}}"#.to_vec(),
            ),
            ServiceRequest::GetNode(_) => ServiceResponse::Data(Vec::new()),
            ServiceRequest::GetNodeType(id) if id == "core.Document" => ServiceResponse::NodeType(
                NodeType::new("core.Document").with_field(NodeField::text("core.Title")),
            ),
            ServiceRequest::GetNodeType(id) => {
                ServiceResponse::Error(ErrorMessage::unknown_node_type(&id))
            }
            ServiceRequest::RemoveNode(_) => ServiceResponse::Ack,
            _ => ServiceResponse::Error(ErrorMessage::internal("not implemented")),
        };
        if write_frame(&mut stream, &response).await.is_err() {
            break;
        }
    }
}

fn connected() -> Arc<StreamTransport<DuplexStream>> {
    let (client, server) = tokio::io::duplex(64 * 1024);
    tokio::spawn(serve(server));
    Arc::new(StreamTransport::new(client))
}

#[tokio::test]
async fn client_over_stream_reads_node() {
    let transport: Arc<dyn RpcTransport> = connected();
    let client = NodeClient::new(transport, Arc::new(FieldRegistry::new()));

    let node = client.get_node("example", "/about").await.unwrap().unwrap();
    assert_eq!(node.path, "/about");
    assert_eq!(node.get_str("core.Title"), Some("About"));

    assert!(client.get_node("example", "/missing").await.unwrap().is_none());
    client.remove_node("example", "/about").await.unwrap();
}

#[tokio::test]
async fn remote_error_keeps_connection_usable() {
    let transport = connected();

    let err = transport
        .call(ServiceRequest::GetNodeType("core.Missing".into()))
        .await
        .unwrap()
        .into_node_type()
        .unwrap_err();
    assert!(matches!(err, ServiceError::Remote { code: 2, .. }));

    assert!(!transport.is_poisoned());
    transport
        .call(ServiceRequest::RemoveNode(NodeArgs::new("example", "/x")))
        .await
        .unwrap()
        .into_ack()
        .unwrap();
}

#[tokio::test]
async fn closed_peer_is_a_transport_failure() {
    let (client, server) = tokio::io::duplex(1024);
    drop(server);
    let transport = StreamTransport::new(client);

    let err = transport
        .call(ServiceRequest::GetNode(NodeArgs::new("example", "/")))
        .await
        .unwrap_err();
    assert!(err.is_transport_failure(), "unexpected error: {err}");
    assert!(transport.is_poisoned());

    let err = transport
        .call(ServiceRequest::GetNode(NodeArgs::new("example", "/")))
        .await
        .unwrap_err();
    assert!(err.is_transport_failure());
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out() {
    // Keep the server end open but never answer.
    let (client, _server) = tokio::io::duplex(1024);
    let transport = StreamTransport::new(client).with_timeout(Some(Duration::from_millis(50)));

    let err = transport
        .call(ServiceRequest::GetNode(NodeArgs::new("example", "/")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Timeout(_)));
    assert!(err.is_transport_failure());
    assert!(transport.is_poisoned());
}
