//! Periodic snapshot push worker

use std::sync::Arc;

use caster_sim_core::{FieldStore, FieldView, Geometry, PhaseThresholds, StoreError, ViewScale};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, warn};

use crate::driver::{ExitReporter, WorkerEvent};
use crate::error::SessionError;
use crate::protocol::{origin, reply, Msg};
use crate::signal::PushListener;
use crate::transport::{MessageSink, Outbox};

pub(crate) struct PushContext<S> {
    pub run: u64,
    pub field: Arc<RwLock<FieldStore>>,
    pub geometry: Geometry,
    pub thresholds: PhaseThresholds,
    pub scale: ViewScale,
    pub listener: PushListener,
    pub outbox: Outbox<S>,
    pub events: mpsc::UnboundedSender<WorkerEvent>,
}

/// Encode the current field as a `data_push` payload.
///
/// Returns `Ok(None)` while the field holds no slices.
fn encode_snapshot(
    field: &FieldStore,
    geometry: &Geometry,
    thresholds: PhaseThresholds,
    scale: ViewScale,
) -> Result<Option<String>, SessionError> {
    let view = FieldView::new(field, geometry, thresholds).with_scale(scale);
    let snapshot = match view.build_snapshot() {
        Ok(snapshot) => snapshot,
        Err(StoreError::Empty) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    serde_json::to_string(&snapshot)
        .map(Some)
        .map_err(|source| SessionError::Serialization {
            what: reply::DATA_PUSH,
            source,
        })
}

/// Push one snapshot per finished step until the run stops.
pub(crate) async fn run_push<S: MessageSink>(mut ctx: PushContext<S>) {
    let reporter = ExitReporter::new(ctx.run, origin::PUSH, ctx.events.clone());

    match push_snapshots(&mut ctx).await {
        Ok(pushed) => debug!("Push worker finished (run {}, {} snapshots)", ctx.run, pushed),
        Err(err) => {
            let _ = ctx.events.send(WorkerEvent::PushFailed { run: ctx.run, error: err });
        }
    }
    reporter.disarm();
}

async fn push_snapshots<S: MessageSink>(ctx: &mut PushContext<S>) -> Result<u64, SessionError> {
    let mut pushed: u64 = 0;

    while ctx.listener.next().await {
        let encoded = {
            let field = ctx.field.read().await;
            encode_snapshot(&field, &ctx.geometry, ctx.thresholds, ctx.scale)
        };

        let content = match encoded {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!("Field empty, nothing to push");
                continue;
            }
            Err(err @ SessionError::Serialization { .. }) => {
                warn!("Skipping snapshot: {}", err);
                continue;
            }
            Err(err) => {
                error!("Snapshot failed: {}", err);
                return Err(err);
            }
        };

        ctx.outbox.send(Msg::new(reply::DATA_PUSH, content)).await?;
        pushed += 1;
    }

    Ok(pushed)
}
