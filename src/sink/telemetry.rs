use std::io;
use std::net::UdpSocket;

use log::warn;

use crate::config::TelemetryConfig;
use crate::module::registry::Registry;
use crate::sink::Sink;

/// Best-effort OSC exporter: one `/<namespace>/sat/<catnum>` message per
/// satellite per cycle with (azimuth, elevation, altitude, velocity) float
/// arguments. Send failures are logged and otherwise ignored.
pub struct TelemetrySink {
    socket: UdpSocket,
    target: String,
    namespace: String,
}

impl TelemetrySink {
    pub fn new(cfg: &TelemetryConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            target: cfg.addr.clone(),
            namespace: cfg.namespace.clone(),
        })
    }
}

impl Sink for TelemetrySink {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn update(&mut self, registry: &Registry, _tstamp: f64) {
        for sat in registry.iter() {
            let address = format!("/{}/sat/{}", self.namespace, sat.catnum);
            let packet = encode_osc_message(
                &address,
                [
                    sat.obs.azimuth_deg as f32,
                    sat.obs.elevation_deg as f32,
                    sat.obs.altitude_km as f32,
                    sat.obs.velocity_km_s as f32,
                ],
            );

            if let Err(e) = self.socket.send_to(&packet, self.target.as_str()) {
                warn!("telemetry send for #{} failed: {e}", sat.catnum);
            }
        }
    }

    fn rebuild(&mut self, _registry: &Registry) {}
}

/// OSC 1.0 message with a `,ffff` type tag: null-terminated strings padded
/// to 4 bytes, followed by big-endian floats.
fn encode_osc_message(address: &str, args: [f32; 4]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(address.len() + 8 + 16);
    push_padded_string(&mut buf, address);
    push_padded_string(&mut buf, ",ffff");
    for arg in args {
        buf.extend_from_slice(&arg.to_be_bytes());
    }
    buf
}

fn push_padded_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osc_wire_format() {
        let packet = encode_osc_message("/satwatch/sat/25544", [1.5, -2.0, 0.0, 7.25]);

        // address is 19 bytes -> padded to 20
        assert_eq!(&packet[..19], b"/satwatch/sat/25544");
        assert_eq!(packet[19], 0);
        // type tag ",ffff" -> padded to 8
        assert_eq!(&packet[20..25], b",ffff");
        assert_eq!(&packet[25..28], &[0, 0, 0]);
        // four big-endian floats
        assert_eq!(&packet[28..32], &1.5f32.to_be_bytes());
        assert_eq!(&packet[32..36], &(-2.0f32).to_be_bytes());
        assert_eq!(&packet[36..40], &0.0f32.to_be_bytes());
        assert_eq!(&packet[40..44], &7.25f32.to_be_bytes());
        assert_eq!(packet.len(), 44);
        assert_eq!(packet.len() % 4, 0);
    }
}
