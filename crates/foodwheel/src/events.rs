use crate::session::Landing;
use crate::sys::location::Fix;
use async_channel::Sender;

/// Where a command's output lines go; the client sees EOF once every clone is dropped.
pub type Reply = Sender<String>;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Spin(Reply),
    Retry(Reply),
    SearchAll(Reply),
    Status(Reply),
    /// Results of a locate run carry the generation it was started with.
    Located { generation: u64, fix: Fix },
    PlaceNamed { generation: u64, name: String },
    Landed(Landing),
    SearchFinished,
    ConfigReload,
}
