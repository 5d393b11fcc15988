//! NATS round trip; runs only when `FLEET_UPDATE_NATS_URL` points at a server.

#![cfg(feature = "nats")]

use fleet_update_bus::NatsMessagePublisher;
use fleet_update_core::{ClientUpdatePublisher, IntegratedToolAgent, ToolAgentUpdatePublisher};
use fleet_update_proto::{
    ClientUpdateMessage, MessageType, PayloadEncoding, ToolAgentUpdateMessage, TopicScheme,
    UpdateMessage,
};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

fn nats_url() -> Option<String> {
    std::env::var("FLEET_UPDATE_NATS_URL").ok()
}

async fn roundtrip(encoding: PayloadEncoding) {
    let Some(url) = nats_url() else {
        eprintln!("Skipping NATS test; set FLEET_UPDATE_NATS_URL=nats://localhost:4222 to run");
        return;
    };

    let prefix = format!("it-{}", Uuid::new_v4().simple());
    let scheme = TopicScheme::new(
        format!("{prefix}.machine.all.client-update"),
        format!("{prefix}.machine.all.tool-update"),
    )
    .unwrap();

    let listener = async_nats::connect(url.as_str()).await.unwrap();
    let mut client_updates = listener
        .subscribe(scheme.client_update().to_string())
        .await
        .unwrap();
    let mut tool_updates = listener
        .subscribe(scheme.tool_update().to_string())
        .await
        .unwrap();
    listener.flush().await.unwrap();

    let nats = Arc::new(NatsMessagePublisher::connect(&url, encoding).await.unwrap());
    ClientUpdatePublisher::new(Arc::clone(&nats))
        .with_topics(&scheme)
        .publish("2.5.0")
        .await
        .unwrap();
    ToolAgentUpdatePublisher::new(Arc::clone(&nats))
        .with_topics(&scheme)
        .publish(&IntegratedToolAgent::new("tool-42", "1.0.3"))
        .await
        .unwrap();
    nats.flush().await.unwrap();

    let message = timeout(Duration::from_secs(5), client_updates.next())
        .await
        .expect("timeout waiting for client update")
        .expect("subscription closed");
    assert_eq!(scheme.parse(&message.subject), Some(MessageType::ClientUpdate));
    let decoded = ClientUpdateMessage::decode(&message.payload, encoding).unwrap();
    assert_eq!(decoded, ClientUpdateMessage::new("2.5.0"));

    let message = timeout(Duration::from_secs(5), tool_updates.next())
        .await
        .expect("timeout waiting for tool update")
        .expect("subscription closed");
    assert_eq!(
        scheme.parse(&message.subject),
        Some(MessageType::ToolAgentUpdate)
    );
    let decoded = ToolAgentUpdateMessage::decode(&message.payload, encoding).unwrap();
    assert_eq!(decoded, ToolAgentUpdateMessage::new("tool-42", "1.0.3"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nats_update_broadcast_roundtrip() {
    roundtrip(PayloadEncoding::Json).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nats_cbor_broadcast_roundtrip() {
    roundtrip(PayloadEncoding::Cbor).await;
}
