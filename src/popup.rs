use std::sync::mpsc::Sender;

use time::OffsetDateTime;

use crate::model::{path_segments, TransferIntent, TransferKey, TransferKind, TransferRecord};
use crate::state::SyncSnapshot;
use crate::styles::{self, ItemStyles};
use crate::timefmt;

/// State mutations the popup may request. The app drains these after drawing
/// and applies them in order, so within one dismissal the navigation pop
/// lands before the transfer removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    NavigateUp,
    DismissTransfer(TransferKey),
}

/// Capability handle for dispatching [`Action`]s. The popup never mutates
/// state directly.
#[derive(Clone)]
pub struct Dispatch {
    tx: Sender<Action>,
}

impl Dispatch {
    pub fn new(tx: Sender<Action>) -> Self {
        Self { tx }
    }

    pub fn navigate_up(&self) {
        let _ = self.tx.send(Action::NavigateUp);
    }

    pub fn dismiss_transfer(&self, key: TransferKey) {
        let _ = self.tx.send(Action::DismissTransfer(key));
    }
}

/// Dismissal callback handed to the popup view.
///
/// The transfer key is captured when the props are built, not re-read at
/// invocation time; a snapshot update between the two cannot redirect the
/// dismissal to a different transfer.
#[derive(Clone)]
pub struct OnHidden {
    dispatch: Dispatch,
    key: Option<TransferKey>,
}

impl OnHidden {
    pub fn invoke(&self) {
        self.dispatch.navigate_up();
        if let Some(key) = &self.key {
            self.dispatch.dismiss_transfer(key.clone());
        }
    }
}

/// Everything the presentational popup needs for one frame.
pub struct TransferPopupProps {
    pub name: String,
    pub intent: TransferIntent,
    pub item_styles: ItemStyles,
    pub complete_portion: f32,
    pub progress_text: String,
    pub on_hidden: OnHidden,
    pub is_done: bool,
}

/// First transfer in insertion order that is a foreground download.
/// Background work (`intent == None`) and uploads never surface here.
pub fn select_active_download(
    transfers: &[(TransferKey, TransferRecord)],
) -> Option<(&TransferKey, &TransferRecord)> {
    transfers
        .iter()
        .find(|(_, r)| r.kind == TransferKind::Download && r.intent != TransferIntent::None)
        .map(|(k, r)| (k, r))
}

/// Pure projection of the snapshot into popup props. Samples nothing and
/// dispatches nothing; `now` is supplied by the caller so the progress text
/// is recomputed on every call.
pub fn project(
    snapshot: &SyncSnapshot,
    path: &str,
    dispatch: &Dispatch,
    now: OffsetDateTime,
) -> TransferPopupProps {
    let item = snapshot.path_item(path);
    let segments = path_segments(path);
    let item_styles = styles::item_styles(&segments, item.ptype, snapshot.username.as_deref());

    let sentinel = TransferRecord::empty();
    let (key, record) = match select_active_download(&snapshot.transfers) {
        Some((key, record)) => (Some(key.clone()), record),
        None => (None, &sentinel),
    };

    TransferPopupProps {
        name: item.name,
        intent: record.intent,
        item_styles,
        complete_portion: record.complete_portion,
        progress_text: timefmt::format_duration_from_now(record.end_estimate, now),
        on_hidden: OnHidden {
            dispatch: dispatch.clone(),
            key,
        },
        is_done: record.is_done,
    }
}

/// Render-time entry point: projects props and, when the tracked download has
/// finished, issues the dismissal itself so the popup never lingers on a done
/// transfer. The completion effect lives here rather than inside [`project`];
/// hosts call `connect` once per frame.
pub fn connect(
    snapshot: &SyncSnapshot,
    path: &str,
    dispatch: &Dispatch,
    now: OffsetDateTime,
) -> TransferPopupProps {
    let props = project(snapshot, path, dispatch, now);
    if props.is_done {
        props.on_hidden.invoke();
    }
    props
}
