use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use lapin::message::Delivery;
use lapin::options::{BasicConsumeOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, Connection, ConnectionProperties, Consumer};
use tracing::{debug, error, info};

use crate::message::InboundMessage;
use crate::sink::MessageSink;

/// Connect to the broker, identifying the connection by service name.
pub async fn connect(url: &str, service_name: &str) -> Result<Connection> {
    let properties = ConnectionProperties::default().with_connection_name(service_name.into());

    let connection = Connection::connect(url, properties)
        .await
        .with_context(|| format!("Failed to connect to broker at {url}"))?;

    info!("Connected to broker at {}", url);
    Ok(connection)
}

/// Declare the destination and subscribe a single consumer for the process
/// lifetime. Acknowledgment stays with the transport (`no_ack`): this code
/// never acks or rejects a delivery.
pub async fn register(channel: &Channel, destination: &str, consumer_tag: &str) -> Result<Consumer> {
    channel
        .queue_declare(
            destination,
            QueueDeclareOptions::default(),
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("Failed to declare destination '{destination}'"))?;

    let consumer = channel
        .basic_consume(
            destination,
            consumer_tag,
            BasicConsumeOptions {
                no_ack: true,
                ..BasicConsumeOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("Failed to subscribe to destination '{destination}'"))?;

    info!("Listening on destination '{}'", destination);
    Ok(consumer)
}

/// Delivery loop: every delivery reaches the sink exactly once, unfiltered
/// and untransformed. Runs until the transport ends the stream.
pub async fn run<W: Write>(consumer: Consumer, sink: MessageSink<W>) -> Result<()> {
    let messages = consumer.filter_map(|delivery| async move {
        match delivery {
            Ok(delivery) => Some(inbound_from_delivery(&delivery)),
            Err(e) => {
                error!("Consumer error: {}", e);
                None
            }
        }
    });
    futures::pin_mut!(messages);

    dispatch(messages, sink).await;

    info!("Consumer stream ended");
    Ok(())
}

/// Hand each message to the sink. A write failure is reported and forgotten;
/// there is no retry or dead-lettering.
async fn dispatch<S, W>(mut messages: S, mut sink: MessageSink<W>)
where
    S: Stream<Item = InboundMessage> + Unpin,
    W: Write,
{
    while let Some(message) = messages.next().await {
        debug!(
            "Received {} byte(s) on '{}'",
            message.body.len(),
            message.destination
        );
        if let Err(e) = sink.write(&message) {
            error!("Failed to write message to sink: {}", e);
        }
    }
}

fn inbound_from_delivery(delivery: &Delivery) -> InboundMessage {
    InboundMessage {
        destination: delivery.routing_key.as_str().to_string(),
        headers: header_map(delivery.properties.headers()),
        body: delivery.data.clone(),
    }
}

fn header_map(headers: &Option<FieldTable>) -> BTreeMap<String, String> {
    headers
        .as_ref()
        .map(|table| {
            table
                .inner()
                .iter()
                .map(|(key, value)| (key.as_str().to_string(), header_value(value)))
                .collect()
        })
        .unwrap_or_default()
}

fn header_value(value: &AMQPValue) -> String {
    match value {
        AMQPValue::LongString(s) => String::from_utf8_lossy(s.as_bytes()).into_owned(),
        AMQPValue::ShortString(s) => s.as_str().to_string(),
        AMQPValue::Boolean(b) => b.to_string(),
        AMQPValue::ShortInt(i) => i.to_string(),
        AMQPValue::LongInt(i) => i.to_string(),
        AMQPValue::LongLongInt(i) => i.to_string(),
        AMQPValue::Float(v) => v.to_string(),
        AMQPValue::Double(v) => v.to_string(),
        AMQPValue::Timestamp(t) => t.to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> InboundMessage {
        InboundMessage {
            destination: "backend".to_string(),
            headers: BTreeMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_writes_every_message() {
        let messages = futures::stream::iter(vec![
            message("one"),
            message("two"),
            message("three"),
        ]);

        let mut buf = Vec::new();
        dispatch(messages, MessageSink::new(&mut buf)).await;

        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.lines().count(), 3);
        assert!(out.contains("one"));
        assert!(out.contains("two"));
        assert!(out.contains("three"));
    }

    #[tokio::test]
    async fn test_dispatch_accepts_arbitrary_payloads() {
        let malformed = InboundMessage {
            destination: "backend".to_string(),
            headers: BTreeMap::new(),
            body: vec![0x00, 0xff, 0xfe],
        };
        let messages = futures::stream::iter(vec![malformed, message("")]);

        let mut buf = Vec::new();
        dispatch(messages, MessageSink::new(&mut buf)).await;

        assert_eq!(String::from_utf8_lossy(&buf).lines().count(), 2);
    }

    #[test]
    fn test_header_map_converts_common_values() {
        let mut table = FieldTable::default();
        table.insert("traceId".into(), AMQPValue::LongString("4bf92f35".into()));
        table.insert("redelivered".into(), AMQPValue::Boolean(false));
        table.insert("attempt".into(), AMQPValue::LongInt(3));

        let map = header_map(&Some(table));
        assert_eq!(map.get("traceId").map(String::as_str), Some("4bf92f35"));
        assert_eq!(map.get("redelivered").map(String::as_str), Some("false"));
        assert_eq!(map.get("attempt").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_header_map_empty_when_absent() {
        assert!(header_map(&None).is_empty());
    }
}
