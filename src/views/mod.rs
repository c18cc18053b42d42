pub mod chat;
pub mod gate;
pub mod shared;

pub use chat::ChatWidget;
pub use gate::GateView;
