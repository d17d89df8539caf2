//! Session hub for the strand temperature field service
//!
//! A [`Hub`] accepts `{type, content}` messages from one client, drives a
//! [`SliceStepper`](caster_sim_core::SliceStepper) on a blocking worker while
//! the session runs, pushes a field snapshot after every step and answers
//! derived-data queries against the live field.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use caster_sim_core::{LumpedCoolingStepper, StaticSteelCatalog};
//! use caster_sim_session::{Hub, HubConfig, Msg};
//! use tokio::sync::mpsc;
//!
//! # async fn serve() -> Result<(), caster_sim_session::SessionError> {
//! let (inbound_tx, inbound_rx) = mpsc::channel(10);
//! let (outbound_tx, _outbound_rx) = mpsc::channel::<Msg>(64);
//! let catalog = Arc::new(StaticSteelCatalog::new().with_grade(1, 1460.0, 1520.0));
//! let hub = Hub::new(HubConfig::default(), outbound_tx, Box::new(LumpedCoolingStepper::default()), catalog);
//!
//! inbound_tx.send(Msg::new("start", "")).await.ok();
//! hub.run(inbound_rx).await
//! # }
//! ```

mod command;
mod config;
mod driver;
mod error;
mod hub;
mod protocol;
mod push;
mod signal;
mod state;
mod transport;

pub use command::Command;
pub use config::{HubConfig, TailPolicy};
pub use error::{SessionError, TransportError};
pub use hub::Hub;
pub use protocol::{inbound, origin, reply, Env, ErrorReply, Msg, VerticalRequest};
pub use signal::{CalcSignal, PushListener, StepNotifier};
pub use state::Phase;
pub use transport::{MessageSink, Outbox};
