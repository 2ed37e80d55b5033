//! Queues between a board and its collaborators
//!
//! Balls leaving the arena travel as [`Envelope`]s; link-state changes travel
//! as [`ProtocolMessage`]s. Both move over bounded [`Channel`]s so producers on
//! other threads never block the frame loop.

use std::fmt;
use std::str::FromStr;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use glam::DVec2;

use crate::error::BoardError;
use crate::sim::ball::Ball;
use crate::sim::wall::WallSide;

/// Bounded multi-producer channel owned by a board
#[derive(Debug, Clone)]
pub struct Channel<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Channel<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Tries to send (returns immediately)
    pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
        self.sender.try_send(item)
    }

    /// Tries to receive (non-blocking)
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Everything queued right now, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Drop everything queued right now
    pub fn clear(&self) {
        for _ in self.receiver.try_iter() {}
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Clone of the sender for another thread
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    /// Clone of the receiver for another thread
    pub fn receiver(&self) -> Receiver<T> {
        self.receiver.clone()
    }
}

/// A ball on its way out of the arena.
///
/// `board` is the destination arena (`None` for a portal whose exit is on
/// this same arena); `gadget` is the destination portal, absent for
/// crossings through a wall.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub ball: Ball,
    pub board: Option<String>,
    pub gadget: Option<String>,
}

impl Envelope {
    /// Crossing through a wall into `board`
    pub fn to_board(ball: Ball, board: &str) -> Self {
        Self {
            ball,
            board: Some(board.to_string()),
            gadget: None,
        }
    }

    /// Travel through a portal to `portal` on `board` (or locally)
    pub fn to_portal(ball: Ball, board: Option<&str>, portal: &str) -> Self {
        Self {
            ball,
            board: board.map(str::to_string),
            gadget: Some(portal.to_string()),
        }
    }

    /// True when the destination is on the sending arena
    pub fn is_local(&self) -> bool {
        self.board.is_none()
    }

    /// Wire message a network collaborator would send for this envelope
    pub fn to_message(&self, sender: &str) -> Option<ProtocolMessage> {
        let receiver = self.board.clone()?;
        let sender = sender.to_string();
        let vel = self.ball.carried_vel();
        Some(match &self.gadget {
            Some(portal) => ProtocolMessage::PortalTeleport {
                sender,
                receiver,
                portal: portal.clone(),
                vel,
            },
            None => ProtocolMessage::WallTeleport {
                sender,
                receiver,
                pos: self.ball.pos(),
                vel,
            },
        })
    }
}

/// Board-to-board message, rendered as `sender--->receiver:TYPE:args`
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    WallTeleport {
        sender: String,
        receiver: String,
        pos: DVec2,
        vel: DVec2,
    },
    PortalTeleport {
        sender: String,
        receiver: String,
        portal: String,
        vel: DVec2,
    },
    Link {
        sender: String,
        receiver: String,
        other: String,
        side: WallSide,
    },
    Delink {
        sender: String,
        receiver: String,
        other: String,
        side: WallSide,
    },
}

impl ProtocolMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolMessage::WallTeleport { .. } => "WALL_TELEPORT",
            ProtocolMessage::PortalTeleport { .. } => "PORTAL_TELEPORT",
            ProtocolMessage::Link { .. } => "LINK",
            ProtocolMessage::Delink { .. } => "DELINK",
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            ProtocolMessage::WallTeleport { sender, .. }
            | ProtocolMessage::PortalTeleport { sender, .. }
            | ProtocolMessage::Link { sender, .. }
            | ProtocolMessage::Delink { sender, .. } => sender,
        }
    }

    pub fn receiver(&self) -> &str {
        match self {
            ProtocolMessage::WallTeleport { receiver, .. }
            | ProtocolMessage::PortalTeleport { receiver, .. }
            | ProtocolMessage::Link { receiver, .. }
            | ProtocolMessage::Delink { receiver, .. } => receiver,
        }
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--->{}:{}:", self.sender(), self.receiver(), self.kind())?;
        match self {
            ProtocolMessage::WallTeleport { pos, vel, .. } => {
                write!(f, "{} {} {} {}", pos.x, pos.y, vel.x, vel.y)
            }
            ProtocolMessage::PortalTeleport { portal, vel, .. } => {
                write!(f, "{} {} {}", portal, vel.x, vel.y)
            }
            ProtocolMessage::Link { other, side, .. } | ProtocolMessage::Delink { other, side, .. } => {
                write!(f, "{other} {side}")
            }
        }
    }
}

impl FromStr for ProtocolMessage {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || BoardError::InvalidMessage(s.to_string());
        let name = |n: &str| -> Result<String, BoardError> {
            if is_valid_name(n) {
                Ok(n.to_string())
            } else {
                Err(BoardError::InvalidName(n.to_string()))
            }
        };

        let (sender, rest) = s.split_once("--->").ok_or_else(bad)?;
        let mut parts = rest.splitn(3, ':');
        let receiver = parts.next().ok_or_else(bad)?;
        let kind = parts.next().ok_or_else(bad)?;
        let args: Vec<&str> = parts.next().ok_or_else(bad)?.split_whitespace().collect();

        let (sender, receiver) = (name(sender)?, name(receiver)?);
        let num = |i: usize| -> Result<f64, BoardError> {
            args.get(i)
                .and_then(|a| a.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .ok_or_else(bad)
        };
        let side = |a: &str| a.parse::<WallSide>().map_err(|_| bad());

        match (kind, args.len()) {
            ("WALL_TELEPORT", 4) => Ok(ProtocolMessage::WallTeleport {
                sender,
                receiver,
                pos: DVec2::new(num(0)?, num(1)?),
                vel: DVec2::new(num(2)?, num(3)?),
            }),
            ("PORTAL_TELEPORT", 3) => Ok(ProtocolMessage::PortalTeleport {
                sender,
                receiver,
                portal: name(args[0])?,
                vel: DVec2::new(num(1)?, num(2)?),
            }),
            ("LINK", 2) => Ok(ProtocolMessage::Link {
                sender,
                receiver,
                other: name(args[0])?,
                side: side(args[1])?,
            }),
            ("DELINK", 2) => Ok(ProtocolMessage::Delink {
                sender,
                receiver,
                other: name(args[0])?,
                side: side(args[1])?,
            }),
            _ => Err(bad()),
        }
    }
}

/// Board, gadget and portal names: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
