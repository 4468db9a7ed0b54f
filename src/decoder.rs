// Command decoder
// Turns the `#X ...` debug lines printed by the motes into typed events

use thiserror::Error;

use crate::events::{Event, PacketPhase};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not a command line")]
    NotACommand,
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("command {command} expects {expected} arguments, got {got}")]
    MissingArgument {
        command: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid number {value:?} in command {command}")]
    InvalidNumber { command: &'static str, value: String },
}

/// Decode one line of serial output.
///
/// `now` is the local-clock timestamp (ms) attached to packet events; the motes themselves do
/// not print one. Extra trailing tokens are ignored.
pub fn decode_line(line: &str, now: f64) -> Result<Event, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.starts_with('#') {
        return Err(DecodeError::NotACommand);
    }

    let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
    let head = tokens.first().copied().unwrap_or("#");
    let args = &tokens[1..];

    match head {
        "#H" => {
            let a = Args::new("H", args, 1)?;
            Ok(Event::Highlight { id: a.num(0)? })
        }
        "#L" => {
            let a = Args::new("L", args, 2)?;
            Ok(Event::LinkHop { src: a.num(0)?, dst: a.num(1)? })
        }
        "#R" => {
            let a = Args::new("R", args, 2)?;
            Ok(Event::Rank { id: a.num(0)?, rank: a.num(1)? })
        }
        "#N" => {
            let a = Args::new("N", args, 2)?;
            Ok(Event::Neighbor { id: a.num(0)?, neighbor_id: a.num(1)? })
        }
        "#P" => {
            // #P <from> <to> <mod 0|1> <seqNum>
            let a = Args::new("P", args, 4)?;
            let phase = if a.num::<u32>(2)? != 0 {
                PacketPhase::Received
            } else {
                PacketPhase::Sent
            };
            Ok(Event::Packet {
                from: a.num(0)?,
                to: a.num(1)?,
                seq_num: a.num(3)?,
                phase,
                timestamp: now,
            })
        }
        "#DR" => {
            let a = Args::new("DR", args, 4)?;
            Ok(Event::DeliveryReport {
                id: a.num(0)?,
                from: a.num(1)?,
                received: a.num(2)?,
                expected: a.num(3)?,
            })
        }
        "#DC" => {
            let a = Args::new("DC", args, 3)?;
            Ok(Event::DutyCycle {
                id: a.num(0)?,
                on_ticks: a.num(1)?,
                total_ticks: a.num(2)?,
            })
        }
        other => Err(DecodeError::UnknownCommand(other.trim_start_matches('#').to_string())),
    }
}

struct Args<'a> {
    command: &'static str,
    tokens: &'a [&'a str],
}

impl<'a> Args<'a> {
    fn new(command: &'static str, tokens: &'a [&'a str], expected: usize) -> Result<Self, DecodeError> {
        if tokens.len() < expected {
            return Err(DecodeError::MissingArgument {
                command,
                expected,
                got: tokens.len(),
            });
        }
        Ok(Args { command, tokens })
    }

    fn num<T: std::str::FromStr>(&self, idx: usize) -> Result<T, DecodeError> {
        let raw = self.tokens[idx];
        raw.parse().map_err(|_| DecodeError::InvalidNumber {
            command: self.command,
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_packet_sent_and_received() {
        let sent = decode_line("#P 2 1 0 7", 100.0).unwrap();
        assert_eq!(
            sent,
            Event::Packet { from: 2, to: 1, seq_num: 7, phase: PacketPhase::Sent, timestamp: 100.0 }
        );

        let rec = decode_line("#P 2 1 1 7\r\n", 145.0).unwrap();
        assert_eq!(
            rec,
            Event::Packet { from: 2, to: 1, seq_num: 7, phase: PacketPhase::Received, timestamp: 145.0 }
        );
    }

    #[test]
    fn test_decode_topology_commands() {
        assert_eq!(decode_line("#H 4", 0.0).unwrap(), Event::Highlight { id: 4 });
        assert_eq!(decode_line("#L 3 1", 0.0).unwrap(), Event::LinkHop { src: 3, dst: 1 });
        assert_eq!(decode_line("#R 3 512", 0.0).unwrap(), Event::Rank { id: 3, rank: 512 });
        assert_eq!(decode_line("#N 3 5", 0.0).unwrap(), Event::Neighbor { id: 3, neighbor_id: 5 });
    }

    #[test]
    fn test_decode_reports() {
        assert_eq!(
            decode_line("#DR 1 3 9 10", 0.0).unwrap(),
            Event::DeliveryReport { id: 1, from: 3, received: 9, expected: 10 }
        );
        assert_eq!(
            decode_line("#DC 3 120 4096", 0.0).unwrap(),
            Event::DutyCycle { id: 3, on_ticks: 120, total_ticks: 4096 }
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_line("booting contiki", 0.0), Err(DecodeError::NotACommand));
        assert_eq!(decode_line("#X 1", 0.0), Err(DecodeError::UnknownCommand("X".into())));
        assert!(matches!(
            decode_line("#L 3", 0.0),
            Err(DecodeError::MissingArgument { command: "L", expected: 2, got: 1 })
        ));
        assert!(matches!(
            decode_line("#H abc", 0.0),
            Err(DecodeError::InvalidNumber { command: "H", .. })
        ));
    }
}
