use crate::infra::MqttSettings;
use crate::services::bridge::MqttPublisher;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const CLIENT_ID: &str = "dockswitch";
const KEEP_ALIVE: Duration = Duration::from_secs(60);
const POLL_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// One inbound broker message, as handed to the handler loop.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Owns the broker connection: the client handle, the event loop, and the
/// wildcard subscription that must be re-issued on every reconnect.
pub struct MqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
    subscription: String,
}

impl MqttSession {
    /// Connects and drives the event loop to the first ConnAck, so an
    /// unreachable broker fails here, at startup, not somewhere in the
    /// background. The initial subscription is issued before returning.
    pub async fn connect(settings: &MqttSettings, subscription: String) -> Result<Self> {
        let mut options = MqttOptions::new(CLIENT_ID, &settings.host, settings.port);
        options.set_keep_alive(KEEP_ALIVE);
        apply_credentials(&mut options, settings);

        let (client, mut eventloop) = AsyncClient::new(options, 64);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => continue,
                Err(e) => bail!("broker connection to {} failed: {e}", settings.host),
            }
        }
        info!("connected to mqtt broker at {}", settings.host);

        client
            .subscribe(&subscription, QoS::AtLeastOnce)
            .await
            .context("issuing initial subscription")?;

        Ok(Self {
            client,
            eventloop,
            subscription,
        })
    }

    /// Clonable handle for publishing and for the final disconnect.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Moves the event loop into a background task that forwards inbound
    /// publishes into `tx`. Subscriptions do not reliably survive broker
    /// reconnects, so the wildcard is re-issued from every ConnAck. The
    /// task ends when the client disconnects or the channel is dropped.
    pub fn spawn_pump(self, tx: mpsc::Sender<InboundMessage>) -> JoinHandle<()> {
        let Self {
            client,
            mut eventloop,
            subscription,
        } = self;

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        debug!("(re)connected, renewing subscription to {subscription}");
                        if let Err(e) = client.subscribe(&subscription, QoS::AtLeastOnce).await {
                            error!("resubscribe failed: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = InboundMessage {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        debug!("mqtt disconnect issued, stopping message pump");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if tx.is_closed() {
                            break;
                        }
                        warn!("mqtt event loop error: {e}");
                        tokio::time::sleep(POLL_RETRY_BACKOFF).await;
                    }
                }
            }
        })
    }
}

/// A username without a password is a valid broker configuration; only a
/// password with no username to go with it is unusable.
fn apply_credentials(options: &mut MqttOptions, settings: &MqttSettings) {
    match (&settings.user, &settings.password) {
        (Some(user), Some(password)) => {
            options.set_credentials(user, password);
        }
        (Some(user), None) => {
            options.set_credentials(user, "");
        }
        (None, Some(_)) => {
            warn!("MQTT_PASSWORD is set without MQTT_USER; connecting anonymously");
        }
        (None, None) => {}
    }
}

#[async_trait]
impl MqttPublisher for AsyncClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()> {
        AsyncClient::publish(self, topic, QoS::AtLeastOnce, retain, payload)
            .await
            .with_context(|| format!("publishing to {topic}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mqtt_settings(user: Option<&str>, password: Option<&str>) -> MqttSettings {
        MqttSettings {
            host: "broker.test".into(),
            port: 1883,
            user: user.map(String::from),
            password: password.map(String::from),
        }
    }

    fn credentials_for(settings: &MqttSettings) -> Option<(String, String)> {
        let mut options = MqttOptions::new(CLIENT_ID, &settings.host, settings.port);
        apply_credentials(&mut options, settings);
        options.credentials()
    }

    #[test]
    fn full_credentials_are_passed_through() {
        let creds = credentials_for(&mqtt_settings(Some("ha"), Some("secret")));
        assert_eq!(creds, Some(("ha".to_string(), "secret".to_string())));
    }

    #[test]
    fn username_without_password_is_still_used() {
        let creds = credentials_for(&mqtt_settings(Some("ha"), None));
        assert_eq!(creds, Some(("ha".to_string(), String::new())));
    }

    #[test]
    fn password_alone_falls_back_to_anonymous() {
        assert_eq!(credentials_for(&mqtt_settings(None, Some("secret"))), None);
    }

    #[test]
    fn no_credentials_stay_anonymous() {
        assert_eq!(credentials_for(&mqtt_settings(None, None)), None);
    }
}
