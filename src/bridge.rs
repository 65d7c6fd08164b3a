//! The session bridge (spec component C7): hands a ready room off to a
//! freshly bound datagram transport and a dedicated simulation tick task.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::config::GameplaySection;
use crate::protocol::datagram::ClientDatagram;
use crate::shutdown::ShutdownWatch;
use crate::simulation::sim::Simulation;
use crate::transport::datagram::{DatagramTransport, InboundDatagram};

/// What the dispatcher needs to announce `GAME_START` to room members.
pub struct GameStartInfo {
    pub udp_port: u16,
}

/// Binds new simulation instances to fresh datagram ports and runs their
/// fixed-step tick loops as independent tasks.
pub struct SessionBridge {
    gameplay: GameplaySection,
    tick_dt: f32,
    shutdown: ShutdownWatch,
}

impl SessionBridge {
    pub fn new(gameplay: GameplaySection, tick_dt: f32, shutdown: ShutdownWatch) -> Self {
        Self {
            gameplay,
            tick_dt,
            shutdown,
        }
    }

    /// Start a simulation for `seats` (each room member's assigned seat).
    /// Binds a fresh UDP port and spawns its tick task; returns the port so
    /// the caller can include it in `GAME_START`.
    pub async fn start_room(&self, seats: &[u8]) -> std::io::Result<GameStartInfo> {
        let (transport, rx, udp_port) = DatagramTransport::bind(0).await?;
        let simulation = Simulation::new(self.gameplay.clone(), seats);
        debug!(udp_port, seats = seats.len(), "simulation bound, starting tick loop");

        tokio::spawn(run_simulation(
            transport,
            rx,
            simulation,
            self.tick_dt,
            self.shutdown.clone(),
        ));

        Ok(GameStartInfo { udp_port })
    }
}

async fn run_simulation(
    transport: DatagramTransport,
    mut inbound: mpsc::UnboundedReceiver<InboundDatagram>,
    mut simulation: Simulation,
    tick_dt: f32,
    mut shutdown: ShutdownWatch,
) {
    let mut endpoint_seat: HashMap<String, u8> = HashMap::new();
    let mut seat_endpoint: HashMap<u8, String> = HashMap::new();
    let mut seq: u32 = 0;
    let mut interval = tokio::time::interval(Duration::from_secs_f32(tick_dt));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = interval.tick() => {
                ingest_inbound(
                    &mut inbound,
                    &mut simulation,
                    &mut endpoint_seat,
                    &mut seat_endpoint,
                    &transport,
                    &mut seq,
                )
                .await;

                let output = simulation.tick(tick_dt);
                for net_id in &output.destroyed {
                    let bytes = crate::protocol::datagram::ServerDatagram::EntityDestroy { net_id: *net_id }
                        .encode(next_seq(&mut seq));
                    broadcast(&transport, &seat_endpoint, &bytes).await;
                }
                let update_bytes = output.entity_update.encode(next_seq(&mut seq));
                broadcast(&transport, &seat_endpoint, &update_bytes).await;
                let state_bytes = output.game_state.encode(next_seq(&mut seq));
                broadcast(&transport, &seat_endpoint, &state_bytes).await;
            }
        }
    }

    transport.shutdown();
    debug!("simulation tick loop stopped");
}

fn next_seq(seq: &mut u32) -> u32 {
    let current = *seq;
    *seq = seq.wrapping_add(1);
    current
}

async fn ingest_inbound(
    inbound: &mut mpsc::UnboundedReceiver<InboundDatagram>,
    simulation: &mut Simulation,
    endpoint_seat: &mut HashMap<String, u8>,
    seat_endpoint: &mut HashMap<u8, String>,
    transport: &DatagramTransport,
    seq: &mut u32,
) {
    while let Ok(datagram) = inbound.try_recv() {
        let decoded = ClientDatagram::decode(datagram.msg_type, &datagram.payload);
        match decoded {
            Ok(ClientDatagram::ClientPing { seat, .. }) => {
                if let Some(response) = simulation.client_ping(seat) {
                    endpoint_seat.insert(datagram.from.clone(), seat);
                    seat_endpoint.insert(seat, datagram.from.clone());
                    for message in response.datagrams {
                        let bytes = message.encode(next_seq(seq));
                        if let Err(e) = transport.send_to(&datagram.from, &bytes).await {
                            warn!(endpoint = %datagram.from, error = %e, "failed to send ping burst");
                        }
                    }
                }
            }
            Ok(ClientDatagram::PlayerInput { direction }) => {
                if let Some(&seat) = endpoint_seat.get(&datagram.from) {
                    simulation.apply_player_input(seat, direction);
                } else {
                    trace!(endpoint = %datagram.from, "input from unbound endpoint ignored");
                }
            }
            Err(e) => {
                warn!(endpoint = %datagram.from, error = %e, "malformed datagram");
            }
        }
    }
}

async fn broadcast(transport: &DatagramTransport, seat_endpoint: &HashMap<u8, String>, bytes: &[u8]) {
    for endpoint in seat_endpoint.values() {
        if let Err(e) = transport.send_to(endpoint, bytes).await {
            warn!(%endpoint, error = %e, "broadcast send failed");
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::shutdown::Shutdown;

    #[tokio::test]
    async fn start_room_binds_a_port_and_spawns_a_task() {
        let (shutdown, watch) = Shutdown::new();
        let bridge = SessionBridge::new(GameplaySection::default(), 1.0 / 30.0, watch);
        let info = bridge.start_room(&[1, 2]).await.unwrap();
        assert_ne!(info.udp_port, 0);
        shutdown.trigger();
    }
}
