// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol shared by the relay and its print agents.
//!
//! Two frame shapes travel over the agent socket: the generic
//! `{msg|rta|err}` envelope used for reporting, and the unwrapped
//! job-dispatch frame used only for relay → agent delivery.

pub mod bus;
pub mod envelope;
pub mod error;
pub mod job;
pub mod sender;

pub use bus::{BusEvent, EventBus, EventFilter, Subscription};
pub use envelope::{Envelope, EnvelopeEvent};
pub use error::{ConnectionError, ErrorKind, ProtocolError, SendError};
pub use job::{Inbound, JobDispatch, PrinterRef};
pub use sender::{frame_channel, FrameSender};
