//! Subscription bridge between stream pipelines and schedulers.

pub mod observable;
pub mod observer;

pub use observable::Observable;
pub use observer::{CallbackObserver, Observer, ObserverRef, SafeObserver};
