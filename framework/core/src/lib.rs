mod bus;
mod cancel;

pub mod prelude {
    pub use crate::bus::{EventBus, Subscription};
    pub use crate::cancel::{CancelHandle, CancelListener, SessionCancelledError};
}
