use anyhow::Context;
use parking_lot::Mutex;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{self, Instant};
use stride_ingest_core::*;

mod sentence;
pub use sentence::{parse_sentence, ParseError, Sentence};

#[derive(Clone, Debug)]
pub struct NmeaConfig {
    pub bind_addr: String,       // e.g. "0.0.0.0:10110"
    pub options: LocationOptions,
}

impl Default for NmeaConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:10110".into(), options: LocationOptions::default() }
    }
}

/// Position fixes from NMEA 0183 sentences broadcast over UDP, as sent by
/// GPS receivers and phone "GPS forwarder" apps.
pub struct NmeaUdpSource {
    cfg: NmeaConfig,
    // bound eagerly by is_available() so a busy port is reported before start
    socket: Mutex<Option<std::net::UdpSocket>>,
}

impl NmeaUdpSource {
    pub fn new(cfg: NmeaConfig) -> Self {
        Self { cfg: NmeaConfig { options: cfg.options.clone().clamped(), ..cfg }, socket: Mutex::new(None) }
    }

    fn bind(&self) -> anyhow::Result<()> {
        let mut slot = self.socket.lock();
        if slot.is_none() {
            let s = std::net::UdpSocket::bind(&self.cfg.bind_addr)
                .with_context(|| format!("bind {}", self.cfg.bind_addr))?;
            s.set_nonblocking(true)?;
            *slot = Some(s);
        }
        Ok(())
    }

    /// Address the socket is bound to, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.lock().as_ref().and_then(|s| s.local_addr().ok())
    }
}

#[async_trait::async_trait]
impl LocationSource for NmeaUdpSource {
    fn is_available(&self) -> bool {
        match self.bind() {
            Ok(()) => true,
            Err(e) => {
                log::error!("nmea source unavailable: {e:#}");
                false
            }
        }
    }

    async fn run(&self, tx: LocationTx) -> Result<(), IngestError> {
        self.bind().map_err(|e| LocationError::Unavailable(format!("{e:#}")))?;
        let std_socket = self
            .socket
            .lock()
            .take()
            .ok_or_else(|| IngestError::Msg("socket already taken".into()))?;
        let socket = UdpSocket::from_std(std_socket).context("register socket")?;

        let opts = &self.cfg.options;
        let max_age_ms = opts.maximum_age.as_millis() as i64;
        let mut cached: Option<LocationSample> = None;
        let mut deadline = Instant::now() + opts.timeout;
        let mut buf = vec![0u8; 2048];

        loop {
            let event = match time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Err(_elapsed) => {
                    deadline = Instant::now() + opts.timeout;
                    match cached {
                        Some(s) if now_ms() - s.timestamp_ms <= max_age_ms => LocationEvent::Fix(s),
                        _ => LocationEvent::Error(LocationError::Timeout(opts.timeout)),
                    }
                }
                Ok(Err(e)) => {
                    log::warn!("nmea recv failed: {e}");
                    continue;
                }
                Ok(Ok((len, _peer))) => {
                    let text = String::from_utf8_lossy(&buf[..len]);
                    match pick_event(&text, opts.high_accuracy, now_ms()) {
                        Some(ev) => ev,
                        None => continue,
                    }
                }
            };

            if let LocationEvent::Fix(s) = &event {
                cached = Some(*s);
                deadline = Instant::now() + opts.timeout;
            }
            if tx.send(event).is_err() {
                return Ok(());
            }
        }
    }
}

/// Reduce one datagram to a single event. A fix wins over a "no fix"
/// report; with `high_accuracy`, a fix carrying HDOP wins over one without.
fn pick_event(text: &str, high_accuracy: bool, timestamp_ms: i64) -> Option<LocationEvent> {
    let mut picked: Option<LocationEvent> = None;
    for line in text.lines() {
        match parse_sentence(line) {
            Ok(Some(Sentence::Fix { latitude, longitude, hdop })) => {
                let mut s = LocationSample::new(latitude, longitude, timestamp_ms);
                s.accuracy_m = hdop.map(sentence::hdop_to_meters);
                let replace = match &picked {
                    Some(LocationEvent::Fix(prev)) => {
                        !high_accuracy || s.accuracy_m.is_some() || prev.accuracy_m.is_none()
                    }
                    _ => true,
                };
                if replace {
                    picked = Some(LocationEvent::Fix(s));
                }
            }
            Ok(Some(Sentence::NoFix)) => {
                if picked.is_none() {
                    picked = Some(LocationEvent::Error(LocationError::PositionUnavailable(
                        "receiver reports no fix".into(),
                    )));
                }
            }
            Ok(None) => {}
            Err(e) => log::debug!("skipping sentence {line:?}: {e}"),
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    #[test]
    fn test_pick_prefers_fix_with_hdop() {
        let text = format!("{GGA}\r\n{RMC}\r\n");
        match pick_event(&text, true, 42) {
            Some(LocationEvent::Fix(s)) => {
                assert_eq!(s.timestamp_ms, 42);
                assert!((s.accuracy_m.unwrap() - 4.5).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
        match pick_event(&text, false, 42) {
            Some(LocationEvent::Fix(s)) => assert!(s.accuracy_m.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_pick_reports_no_fix() {
        let ev = pick_event("$GPRMC,123519,V,,,,,,,230394,,\n$GPGSV,1,1,00", true, 0);
        assert!(matches!(ev, Some(LocationEvent::Error(LocationError::PositionUnavailable(_)))));
        assert!(pick_event("$GPGSV,1,1,00\n", true, 0).is_none());
    }

    #[test]
    fn test_busy_port_is_unavailable() {
        let holder = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = holder.local_addr().unwrap();
        let src = NmeaUdpSource::new(NmeaConfig { bind_addr: addr.to_string(), ..Default::default() });
        assert!(!src.is_available());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fix_is_forwarded() {
        let src = NmeaUdpSource::new(NmeaConfig { bind_addr: "127.0.0.1:0".into(), ..Default::default() });
        assert!(src.is_available());
        let addr = src.local_addr().unwrap();

        let (tx, rx) = channel();
        let task = tokio::spawn(async move { src.run(tx).await });

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(RMC.as_bytes(), addr).unwrap();

        let ev = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(3)))
            .await
            .unwrap()
            .unwrap();
        match ev {
            LocationEvent::Fix(s) => {
                assert!((s.latitude - 48.1173).abs() < 1e-4);
                assert!((s.longitude - 11.516_666).abs() < 1e-4);
            }
            other => panic!("unexpected {other:?}"),
        }
        task.abort();
    }
}
