//! Replays a scripted sequence of connection events against a congestion
//! control algorithm and prints the window after each one.
//!
//! ```text
//! ahs-sim --congestion-control ahs --events ack:50,ack:20,ack:-1,rto,ack:30,undo
//! ```

use std::str::FromStr;

use clap::Parser;
use tcp_ahs::config::{set_logger, CongestionArgs};
use tcp_ahs::connection::{CaEvent, CaState, TcpSock};
use tcp_ahs::Connection;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ahs-sim")]
#[command(about = "Drive a congestion control algorithm through scripted connection events")]
struct Args {
    #[clap(flatten)]
    congestion: CongestionArgs,

    /// Comma separated events: `ack:<rtt_ms>[:<acked>]`, `recovery`, `recovered`,
    /// `rto`, `undo`, `state:<phase>`, `event:<kind>`
    #[arg(long, value_delimiter = ',', required = true)]
    events: Vec<SimEvent>,

    /// Segments in flight when the connection opens
    #[arg(long, default_value_t = 10)]
    packets_out: u32,

    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<tracing::level_filters::LevelFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimEvent {
    Ack { rtt_us: i64, acked: u32 },
    EnterRecovery,
    ExitRecovery,
    Timeout,
    Undo,
    State(CaState),
    Event(CaEvent),
}

impl FromStr for SimEvent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let kind = parts.next().unwrap_or_default();
        let arg = parts.next();
        let event = match (kind, arg) {
            ("ack", Some(rtt_ms)) => {
                let rtt_ms: i64 = rtt_ms.parse()?;
                let rtt_us = if rtt_ms > 0 {
                    rtt_ms
                        .checked_mul(1000)
                        .ok_or_else(|| anyhow::anyhow!("rtt `{rtt_ms}` ms out of range"))?
                } else {
                    // Keep "no sample" markers as is
                    rtt_ms
                };
                let acked = match parts.next() {
                    Some(acked) => acked.parse()?,
                    None => 1,
                };
                SimEvent::Ack { rtt_us, acked }
            }
            ("recovery", None) => SimEvent::EnterRecovery,
            ("recovered", None) => SimEvent::ExitRecovery,
            ("rto", None) => SimEvent::Timeout,
            ("undo", None) => SimEvent::Undo,
            ("state", Some(phase)) => SimEvent::State(parse_phase(phase)?),
            ("event", Some(kind)) => SimEvent::Event(parse_ca_event(kind)?),
            _ => anyhow::bail!("unrecognized event `{s}`"),
        };
        Ok(event)
    }
}

fn parse_phase(phase: &str) -> anyhow::Result<CaState> {
    Ok(match phase {
        "open" => CaState::Open,
        "disorder" => CaState::Disorder,
        "cwr" => CaState::Cwr,
        "recovery" => CaState::Recovery,
        "loss" => CaState::Loss,
        other => anyhow::bail!("unknown phase `{other}`"),
    })
}

fn parse_ca_event(kind: &str) -> anyhow::Result<CaEvent> {
    Ok(match kind {
        "tx-start" => CaEvent::TxStart,
        "cwnd-restart" => CaEvent::CwndRestart,
        "complete-cwr" => CaEvent::CompleteCwr,
        "loss" => CaEvent::Loss,
        "ecn-no-ce" => CaEvent::EcnNoCe,
        "ecn-is-ce" => CaEvent::EcnIsCe,
        other => anyhow::bail!("unknown event `{other}`"),
    })
}

fn apply(conn: &mut Connection, ack_seq: &mut u32, event: SimEvent) {
    match event {
        SimEvent::Ack { rtt_us, acked } => {
            *ack_seq = ack_seq.wrapping_add(acked);
            conn.sock_mut().max_packets_out = conn.cwnd();
            conn.sock_mut().is_cwnd_limited = true;
            conn.on_ack(*ack_seq, acked, rtt_us);
        }
        SimEvent::EnterRecovery => conn.enter_recovery(),
        SimEvent::ExitRecovery => conn.exit_recovery(),
        SimEvent::Timeout => conn.on_retransmit_timeout(),
        SimEvent::Undo => conn.undo(),
        SimEvent::State(phase) => conn.set_ca_state(phase),
        SimEvent::Event(kind) => conn.cwnd_event(kind),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    set_logger(args.log_level);

    let settings = args.congestion.build()?;
    let config = settings.build_congestion_config()?;
    info!(algorithm = %config.algorithm, "starting simulation");

    let tp = TcpSock {
        max_packets_out: args.packets_out,
        ..TcpSock::new()
    };
    let mut conn = Connection::with_sock(tp, config.build_boxed());

    let mut ack_seq = 0;
    println!("{:<24} {:>10} {:>10} {:>10}", "event", "cwnd", "ssthresh", "phase");
    for event in args.events {
        apply(&mut conn, &mut ack_seq, event);
        let stats = conn.stats();
        println!(
            "{:<24} {:>10} {:>10} {:>10}",
            format!("{event:?}"),
            stats.cwnd,
            stats.ssthresh,
            stats.ca_state
        );
    }

    let stats = conn.stats();
    info!(
        algorithm = conn.ops().name(),
        cwnd = stats.cwnd,
        min_rtt = ?stats.min_rtt,
        last_rtt = ?stats.last_rtt,
        "simulation finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_ahs::CongestionControlConfig;

    #[test]
    fn test_parse_events() {
        assert_eq!(
            "ack:50".parse::<SimEvent>().unwrap(),
            SimEvent::Ack {
                rtt_us: 50_000,
                acked: 1
            }
        );
        assert_eq!(
            "ack:-1:4".parse::<SimEvent>().unwrap(),
            SimEvent::Ack { rtt_us: -1, acked: 4 }
        );
        assert_eq!("rto".parse::<SimEvent>().unwrap(), SimEvent::Timeout);
        assert_eq!(
            "state:loss".parse::<SimEvent>().unwrap(),
            SimEvent::State(CaState::Loss)
        );
        assert_eq!(
            "event:ecn-is-ce".parse::<SimEvent>().unwrap(),
            SimEvent::Event(CaEvent::EcnIsCe)
        );
        assert!("ack".parse::<SimEvent>().is_err());
        assert!("ack:9223372036854776".parse::<SimEvent>().is_err());
        assert_eq!(
            "ack:9223372036854775".parse::<SimEvent>().unwrap(),
            SimEvent::Ack {
                rtt_us: 9_223_372_036_854_775_000,
                acked: 1
            }
        );
        assert!("state:sleeping".parse::<SimEvent>().is_err());
    }

    #[test]
    fn test_replay() {
        let mut conn = Connection::new(CongestionControlConfig::default().build_boxed());
        let mut ack_seq = 0;
        for event in ["ack:50", "rto", "ack:-1", "undo"] {
            apply(&mut conn, &mut ack_seq, event.parse().unwrap());
        }
        assert_eq!(conn.cwnd(), 65_000);
        assert_eq!(ack_seq, 2);
    }
}
