//! MQTT link over `esp_idf_svc::mqtt`.
//!
//! [`MqttLink`] is the outbound [`PublishPort`].  The receiver thread owns
//! the [`EspMqttConnection`] and turns every client event into a channel
//! message: session changes set the link session level, acknowledgements
//! go to the link channel, command payloads go to the command channel.  Nothing on that thread
//! touches control or telemetry state.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use esp_idf_svc::sys::{ESP_FAIL, EspError};
use log::{info, warn};

use crate::channels::Channels;
use crate::config::{SystemConfig, Topic};
use crate::drivers::task_pin::{TaskSpec, spawn_on_core};
use crate::link::transport::{DeliveryId, LinkEvent, PublishError, PublishPort, Qos};
use crate::link::{route_command, route_link_event};

/// Largest command payload accepted from the broker.
const MAX_COMMAND_BYTES: usize = 256;

/// Shared handle to the ESP-IDF MQTT client.
#[derive(Clone)]
pub struct MqttLink {
    client: Arc<Mutex<EspMqttClient<'static>>>,
}

impl MqttLink {
    /// Create the client.  Connection happens in the background; the
    /// returned connection must be handed to [`spawn_receiver`].
    pub fn new(config: &SystemConfig) -> anyhow::Result<(Self, EspMqttConnection)> {
        let conf = MqttClientConfiguration {
            client_id: Some(config.device_id.as_str()),
            ..Default::default()
        };
        let (client, conn) = EspMqttClient::new(config.broker_uri.as_str(), &conf)?;
        info!("MQTT: client created for {}", config.broker_uri);
        Ok((
            Self {
                client: Arc::new(Mutex::new(client)),
            },
            conn,
        ))
    }

    fn subscribe(&self, topic: &str) {
        let Ok(mut client) = self.client.lock() else {
            warn!("MQTT: client lock poisoned, cannot subscribe");
            return;
        };
        match client.subscribe(topic, QoS::AtLeastOnce) {
            Ok(_) => info!("MQTT: subscribed to {}", topic),
            Err(e) => warn!("MQTT: subscribe to {} failed ({})", topic, e),
        }
    }
}

fn map_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
    }
}

fn publish_error(e: EspError) -> PublishError {
    if e.code() == ESP_FAIL {
        PublishError::Busy
    } else {
        PublishError::Failed(e.code())
    }
}

impl PublishPort for MqttLink {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos) -> Result<DeliveryId, PublishError> {
        let mut client = self.client.lock().map_err(|_| PublishError::Failed(-1))?;
        // Non-blocking: the message goes to the client's outbox.
        client
            .enqueue(topic, map_qos(qos), false, payload)
            .map_err(publish_error)
    }
}

/// Run the connection event loop on its own thread.
pub fn spawn_receiver(
    link: MqttLink,
    mut conn: EspMqttConnection,
    command_topic: Topic,
    channels: &'static Channels,
    spec: TaskSpec,
) -> std::io::Result<JoinHandle<()>> {
    spawn_on_core(spec, move || {
        while let Ok(event) = conn.next() {
            match event.payload() {
                EventPayload::Connected(_) => {
                    info!("MQTT: connected");
                    link.subscribe(&command_topic);
                    route_link_event(LinkEvent::Connected, channels);
                }
                EventPayload::Disconnected => {
                    warn!("MQTT: disconnected");
                    route_link_event(LinkEvent::Disconnected, channels);
                }
                EventPayload::Published(id) => {
                    route_link_event(LinkEvent::Delivered(id), channels);
                }
                EventPayload::Received {
                    topic,
                    data,
                    details,
                    ..
                } => {
                    if !matches!(details, Details::Complete) {
                        warn!("MQTT: fragmented payload ignored");
                        continue;
                    }
                    if topic != Some(command_topic.as_str()) {
                        continue;
                    }
                    if data.len() > MAX_COMMAND_BYTES {
                        warn!("MQTT: oversized command ({} bytes) dropped", data.len());
                        continue;
                    }
                    route_command(data, &channels.command);
                }
                EventPayload::Error(e) => warn!("MQTT: client error ({:?})", e),
                _ => {}
            }
        }
        warn!("MQTT: connection closed, receiver exiting");
    })
}
