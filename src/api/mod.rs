pub mod callback;

pub use callback::{callback_routes, start_callback_server};
