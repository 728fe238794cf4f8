//! Line-oriented console surface.

use cadence_types::ParamValue;

pub const HELP: &str = "\
commands:
  note <n> [vel]     press a key (velocity defaults to 100)
  off <n>            release a key
  set <path> <value> change a parameter
  reload             reload parameters from the registry
  clock [pulses]     send MIDI clock pulses (default 24)
  start | stop       transport start/stop
  panic              all notes off
  status             show counters and arpeggiator state
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Note { note: u8, velocity: u8 },
    Off { note: u8 },
    Set { path: String, value: ParamValue },
    Reload,
    Clock { pulses: u32 },
    Start,
    Stop,
    Panic,
    Status,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let command = match head {
        "note" | "n" => Command::Note {
            note: midi_byte(arg(&args, 0, "note")?)?,
            velocity: match args.get(1) {
                Some(v) => midi_byte(v)?,
                None => 100,
            },
        },
        "off" => Command::Off {
            note: midi_byte(arg(&args, 0, "note")?)?,
        },
        "set" => Command::Set {
            path: arg(&args, 0, "path")?.to_string(),
            value: parse_value(arg(&args, 1, "value")?),
        },
        "reload" => Command::Reload,
        "clock" => Command::Clock {
            pulses: match args.first() {
                Some(p) => p.parse().map_err(|_| format!("bad pulse count: {}", p))?,
                None => 24,
            },
        },
        "start" => Command::Start,
        "stop" => Command::Stop,
        "panic" => Command::Panic,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(Some(command))
}

fn arg<'a>(args: &[&'a str], index: usize, name: &str) -> Result<&'a str, String> {
    args.get(index).copied().ok_or_else(|| format!("missing {}", name))
}

fn midi_byte(s: &str) -> Result<u8, String> {
    match s.parse::<u8>() {
        Ok(v) if v < 128 => Ok(v),
        _ => Err(format!("expected 0-127, got {}", s)),
    }
}

fn parse_value(s: &str) -> ParamValue {
    match s {
        "on" | "true" => ParamValue::Bool(true),
        "off" | "false" => ParamValue::Bool(false),
        _ => {
            if let Ok(i) = s.parse::<i32>() {
                ParamValue::Int(i)
            } else if let Ok(f) = s.parse::<f32>() {
                ParamValue::Float(f)
            } else {
                ParamValue::Text(s.to_string())
            }
        }
    }
}
