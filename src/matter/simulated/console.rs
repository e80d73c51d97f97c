//! Line console for the simulated stack.
//!
//! Stands in for a controller while running on a host: every line is one
//! command acting on the light endpoint.

use super::{OnOffCommand, SimulatedStack};
use crate::device::LedDriver;
use crate::matter::clusters::EndpointId;
use crate::matter::events::{LifecycleEvent, LifecycleEventKind};
use crate::matter::identify::{EFFECT_VARIANT_DEFAULT, IdentifyEffect, IdentifyEvent};
use crate::matter::stack::{MatterStack, StackError};
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HELP: &str = "\
commands:
  on | off | toggle                  On/Off command on the light endpoint
  identify start [effect] [variant]  Identify (no effect) or TriggerEffect
  identify stop                      end identification
  event <kind|0xCODE>                post a lifecycle event
  commission                         run a simulated commissioning
  status                             show light and stack state
  help                               this text
  quit                               leave the console";

/// Fabric node id handed out by `commission`.
const COMMISSION_NODE_ID: u64 = 0x0000_0000_0001_0001;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),

    #[error("missing {0}")]
    MissingArgument(&'static str),

    #[error("invalid {what}: '{value}'")]
    InvalidArgument { what: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    OnOff(OnOffCommand),
    IdentifyStart { effect: Option<u8>, variant: u8 },
    IdentifyStop,
    Event(LifecycleEvent),
    Commission,
    Status,
    Help,
    Quit,
}

fn parse_u8(what: &'static str, value: &str) -> Result<u8, ConsoleError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| ConsoleError::InvalidArgument {
        what,
        value: value.to_string(),
    })
}

fn parse_effect(value: &str) -> Result<u8, ConsoleError> {
    let named = match value {
        "blink" => Some(IdentifyEffect::Blink),
        "breathe" => Some(IdentifyEffect::Breathe),
        "okay" => Some(IdentifyEffect::Okay),
        "channel-change" => Some(IdentifyEffect::ChannelChange),
        "finish" => Some(IdentifyEffect::FinishEffect),
        "stop" => Some(IdentifyEffect::StopEffect),
        _ => None,
    };
    match named {
        Some(effect) => Ok(effect.as_raw()),
        None => parse_u8("effect", value),
    }
}

fn parse_event(value: &str) -> Result<LifecycleEvent, ConsoleError> {
    if let Some(hex) = value.strip_prefix("0x") {
        let code = u16::from_str_radix(hex, 16).map_err(|_| ConsoleError::InvalidArgument {
            what: "event code",
            value: value.to_string(),
        })?;
        return Ok(LifecycleEvent::Unknown { code });
    }
    LifecycleEventKind::from_str(value)
        .map(LifecycleEvent::with_default_payload)
        .map_err(|_| ConsoleError::InvalidArgument {
            what: "event kind",
            value: value.to_string(),
        })
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(ConsoleError::MissingArgument("command"));
        };

        let parsed = match command {
            "on" => Self::OnOff(OnOffCommand::On),
            "off" => Self::OnOff(OnOffCommand::Off),
            "toggle" => Self::OnOff(OnOffCommand::Toggle),
            "identify" => match words.next() {
                Some("start") => {
                    let effect = words.next().map(parse_effect).transpose()?;
                    let variant = words
                        .next()
                        .map(|v| parse_u8("variant", v))
                        .transpose()?
                        .unwrap_or(EFFECT_VARIANT_DEFAULT);
                    Self::IdentifyStart { effect, variant }
                }
                Some("stop") => Self::IdentifyStop,
                Some(other) => {
                    return Err(ConsoleError::InvalidArgument {
                        what: "identify action",
                        value: other.to_string(),
                    });
                }
                None => return Err(ConsoleError::MissingArgument("identify action")),
            },
            "event" => {
                let kind = words.next().ok_or(ConsoleError::MissingArgument("event kind"))?;
                Self::Event(parse_event(kind)?)
            }
            "commission" => Self::Commission,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ConsoleError::UnknownCommand(other.to_string())),
        };
        Ok(parsed)
    }
}

/// Executes console commands against one light endpoint.
pub struct Console {
    stack: SimulatedStack,
    endpoint: EndpointId,
    driver: Arc<LedDriver>,
}

impl Console {
    pub fn new(stack: SimulatedStack, endpoint: EndpointId, driver: Arc<LedDriver>) -> Self {
        Self {
            stack,
            endpoint,
            driver,
        }
    }

    /// Run `command`, returning the reply to print.
    pub fn execute(&self, command: &ConsoleCommand) -> Result<String, StackError> {
        let reply = match command {
            ConsoleCommand::OnOff(cmd) => {
                self.stack.send_on_off_command(self.endpoint, *cmd)?;
                self.status()
            }
            ConsoleCommand::IdentifyStart { effect, variant } => {
                let event = match effect {
                    Some(effect) => IdentifyEvent::trigger(self.endpoint, *effect, *variant),
                    None => IdentifyEvent::start(self.endpoint),
                };
                self.stack.identify(event)?;
                "identify started".to_string()
            }
            ConsoleCommand::IdentifyStop => {
                self.stack.identify(IdentifyEvent::stop(self.endpoint))?;
                "identify stopped".to_string()
            }
            ConsoleCommand::Event(event) => {
                self.stack.post_event(*event)?;
                format!("posted {}", event.kind())
            }
            ConsoleCommand::Commission => {
                self.stack.simulate_commissioning(COMMISSION_NODE_ID, 1)?;
                "commissioned".to_string()
            }
            ConsoleCommand::Status => self.status(),
            ConsoleCommand::Help => HELP.to_string(),
            ConsoleCommand::Quit => String::new(),
        };
        Ok(reply)
    }

    fn status(&self) -> String {
        let level = match self.driver.physical() {
            Some(true) => "output on",
            Some(false) => "output off",
            None => "output unknown",
        };
        format!(
            "light {} (GPIO{} {}{}), {}",
            if self.driver.get() { "on" } else { "off" },
            self.driver.gpio(),
            level,
            if self.driver.is_effect_active() {
                ", identifying"
            } else {
                ""
            },
            if self.stack.is_commissioned() {
                "commissioned"
            } else {
                "not commissioned"
            }
        )
    }

    /// Read commands from `input` until EOF or `quit`.
    pub async fn run<R>(&self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<ConsoleCommand>() {
                Ok(ConsoleCommand::Quit) => break,
                Ok(command) => match self.execute(&command) {
                    Ok(reply) => println!("{reply}"),
                    Err(e) => println!("error: {e}"),
                },
                Err(e) => println!("{e}"),
            }
        }
        Ok(())
    }
}
